use crate::{error::assembler::Location, instruction::LabelId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    /// Instruction index, `None` until the definition is seen.
    pub offset: Option<u16>,
    /// Unscoped name to fall back to when a scoped forward reference is never defined.
    pub fallback: Option<String>,
    pub first_use: Location,
}

/// Labels by name. Forward references get an entry with no offset that a
/// later definition fills in.
#[derive(Debug, Default, Clone)]
pub struct LabelTable {
    labels: Vec<Label>,
    index: HashMap<String, LabelId>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<LabelId> {
        self.index.get(name).copied()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.find(name)
            .and_then(|id| self.labels[id].offset)
            .is_some()
    }

    fn insert(&mut self, label: Label) -> LabelId {
        let id = self.labels.len();
        self.index.insert(label.name.clone(), id);
        self.labels.push(label);
        id
    }

    /// Defines `name` at `offset`. Returns `None` when it is already defined.
    pub fn define(&mut self, name: &str, offset: u16, location: Location) -> Option<LabelId> {
        match self.find(name) {
            Some(id) if self.labels[id].offset.is_some() => None,
            Some(id) => {
                self.labels[id].offset = Some(offset);
                Some(id)
            }
            None => Some(self.insert(Label {
                name: name.to_string(),
                offset: Some(offset),
                fallback: None,
                first_use: location,
            })),
        }
    }

    /// Looks up `name`, creating a forward entry when it is unknown.
    pub fn reference(&mut self, name: &str, fallback: Option<&str>, location: Location) -> LabelId {
        match self.find(name) {
            Some(id) => id,
            None => self.insert(Label {
                name: name.to_string(),
                offset: None,
                fallback: fallback.map(str::to_string),
                first_use: location,
            }),
        }
    }

    /// Final offset of a label, following the unscoped fallback if needed.
    pub fn resolve(&self, id: LabelId) -> Result<u16, &Label> {
        let label = &self.labels[id];
        label
            .offset
            .or_else(|| {
                let fallback = self.find(label.fallback.as_deref()?)?;
                self.labels[fallback].offset
            })
            .ok_or(label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_then_define() {
        let mut table = LabelTable::new();
        let id = table.reference("loop", None, Location::default());
        assert!(table.resolve(id).is_err());
        assert_eq!(table.define("loop", 4, Location::default()), Some(id));
        assert_eq!(table.resolve(id), Ok(4));
    }

    #[test]
    fn duplicate_definition() {
        let mut table = LabelTable::new();
        assert!(table.define("a", 0, Location::default()).is_some());
        assert_eq!(table.define("a", 1, Location::default()), None);
    }

    #[test]
    fn scoped_fallback() {
        let mut table = LabelTable::new();
        let id = table.reference("main.print", Some("print"), Location::default());
        table.define("print", 9, Location::default());
        assert_eq!(table.resolve(id), Ok(9));
    }
}
