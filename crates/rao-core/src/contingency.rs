//! Contingencies: sets of network elements simultaneously tripped.

use serde::{Deserialize, Serialize};

/// Kind of network element a contingency can trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContingencyElementKind {
    Branch,
    Generator,
    Load,
    HvdcLine,
    BusbarSection,
    DanglingLine,
}

/// One element tripped by a contingency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContingencyElement {
    pub network_element_id: String,
    pub kind: ContingencyElementKind,
}

/// A contingency: one or more elements out of service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contingency {
    id: String,
    /// Human-readable label
    name: Option<String>,
    elements: Vec<ContingencyElement>,
}

impl Contingency {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            elements: Vec::new(),
        }
    }

    /// Create an N-1 contingency (single branch outage).
    pub fn single_branch(id: impl Into<String>, branch_id: impl Into<String>) -> Self {
        Self::new(id).with_element(branch_id, ContingencyElementKind::Branch)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_element(
        mut self,
        network_element_id: impl Into<String>,
        kind: ContingencyElementKind,
    ) -> Self {
        self.elements.push(ContingencyElement {
            network_element_id: network_element_id.into(),
            kind,
        });
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name, falling back to the id.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn elements(&self) -> &[ContingencyElement] {
        &self.elements
    }

    /// Order of this contingency (k in N-k).
    pub fn order(&self) -> usize {
        self.elements.len()
    }

    pub fn trips(&self, network_element_id: &str) -> bool {
        self.elements
            .iter()
            .any(|e| e.network_element_id == network_element_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_branch() {
        let co = Contingency::single_branch("co1", "line-1");
        assert_eq!(co.order(), 1);
        assert!(co.trips("line-1"));
        assert!(!co.trips("line-2"));
        assert_eq!(co.name(), "co1");
    }

    #[test]
    fn test_n_2() {
        let co = Contingency::new("co12")
            .with_name("Lines 1 and 2")
            .with_element("line-1", ContingencyElementKind::Branch)
            .with_element("gen-7", ContingencyElementKind::Generator);
        assert_eq!(co.order(), 2);
        assert_eq!(co.name(), "Lines 1 and 2");
        assert_eq!(co.elements()[1].kind, ContingencyElementKind::Generator);
    }
}
