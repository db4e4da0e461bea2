use std::fmt;

use crate::error::{JsonFileError, Result};

pub const FLAG_DELETE_VALUE: u32 = 0;
pub const FLAG_SET_VALUE: u32 = 1;
pub const FLAG_REPLACE_JSON_VALUE: u32 = 2;
pub const FLAG_CREATE_VALUE: u32 = 3;
pub const FLAG_READ_VALUE: u32 = 4;
pub const FLAG_APPEND_ARRAY: u32 = 5;
pub const FLAG_INSERT_ARRAY: u32 = 6;
pub const FLAG_REMOVE_ARRAY_ELEMENT: u32 = 7;
pub const FLAG_VALIDATE_SCHEMA: u32 = 8;
pub const FLAG_DISTINCT_VALUES: u32 = 9;
pub const FLAG_ONLY_IF_EXISTS: u32 = 10;

/// Primary action encoded by a flag word, in priority (bit) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    DeleteValue,
    SetValue,
    ReplaceJsonValue,
    CreateValue,
    ReadValue,
    AppendArray,
    InsertArray,
    RemoveArrayElement,
    DistinctValues,
}

const PRIMARY: [(u32, Action); 9] = [
    (FLAG_DELETE_VALUE, Action::DeleteValue),
    (FLAG_SET_VALUE, Action::SetValue),
    (FLAG_REPLACE_JSON_VALUE, Action::ReplaceJsonValue),
    (FLAG_CREATE_VALUE, Action::CreateValue),
    (FLAG_READ_VALUE, Action::ReadValue),
    (FLAG_APPEND_ARRAY, Action::AppendArray),
    (FLAG_INSERT_ARRAY, Action::InsertArray),
    (FLAG_REMOVE_ARRAY_ELEMENT, Action::RemoveArrayElement),
    (FLAG_DISTINCT_VALUES, Action::DistinctValues),
];

impl Action {
    pub fn bit(self) -> u32 {
        match self {
            Action::DeleteValue => FLAG_DELETE_VALUE,
            Action::SetValue => FLAG_SET_VALUE,
            Action::ReplaceJsonValue => FLAG_REPLACE_JSON_VALUE,
            Action::CreateValue => FLAG_CREATE_VALUE,
            Action::ReadValue => FLAG_READ_VALUE,
            Action::AppendArray => FLAG_APPEND_ARRAY,
            Action::InsertArray => FLAG_INSERT_ARRAY,
            Action::RemoveArrayElement => FLAG_REMOVE_ARRAY_ELEMENT,
            Action::DistinctValues => FLAG_DISTINCT_VALUES,
        }
    }

    /// Whether the action rewrites the target file.
    pub fn is_write(self) -> bool {
        !matches!(self, Action::ReadValue)
    }

    /// Create-if-absent addresses nodes with a JSON Pointer; all others use JSONPath.
    pub fn uses_pointer(self) -> bool {
        matches!(self, Action::CreateValue)
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::DeleteValue => "deleteValue",
            Action::SetValue => "setValue",
            Action::ReplaceJsonValue => "replaceJsonValue",
            Action::CreateValue => "createJsonPointerValue",
            Action::ReadValue => "readValue",
            Action::AppendArray => "appendArray",
            Action::InsertArray => "insertArray",
            Action::RemoveArrayElement => "removeArrayElement",
            Action::DistinctValues => "distinctValues",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ActionFlags(u32);

impl ActionFlags {
    pub const fn from_bits(bits: u32) -> Self {
        ActionFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn test(self, bit: u32) -> bool {
        bit < 32 && self.0 & (1 << bit) != 0
    }

    pub fn with(self, bit: u32) -> Self {
        ActionFlags(self.0 | (1 << bit))
    }

    pub fn with_action(self, action: Action) -> Self {
        self.with(action.bit())
    }

    pub fn validate_schema(self) -> bool {
        self.test(FLAG_VALIDATE_SCHEMA)
    }

    pub fn only_if_exists(self) -> bool {
        self.test(FLAG_ONLY_IF_EXISTS)
    }

    /// All primary actions present, in priority order.
    pub fn actions(self) -> Vec<Action> {
        PRIMARY
            .iter()
            .filter(|(bit, _)| self.test(*bit))
            .map(|(_, a)| *a)
            .collect()
    }

    /// First primary action in bit order, or `None` when no primary bit is set.
    pub fn primary(self) -> Option<Action> {
        self.actions().into_iter().next()
    }

    /// Like `primary`, but more than one primary bit is rejected.
    pub fn primary_strict(self) -> Result<Option<Action>> {
        let actions = self.actions();
        if actions.len() > 1 {
            let names: Vec<&str> = actions.iter().map(|a| a.name()).collect();
            return Err(JsonFileError::InvalidArgument(format!(
                "flags {} select more than one action: {}",
                self.0,
                names.join(", ")
            )));
        }
        Ok(actions.into_iter().next())
    }
}

impl From<Action> for ActionFlags {
    fn from(action: Action) -> Self {
        ActionFlags::default().with_action(action)
    }
}

impl From<u32> for ActionFlags {
    fn from(bits: u32) -> Self {
        ActionFlags(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_values_match_table_format() {
        assert_eq!(ActionFlags::from(Action::DeleteValue).bits(), 1);
        assert_eq!(ActionFlags::from(Action::SetValue).bits(), 2);
        assert_eq!(ActionFlags::from(Action::CreateValue).bits(), 8);
        assert_eq!(ActionFlags::from(Action::RemoveArrayElement).bits(), 128);
        assert_eq!(ActionFlags::from(Action::DistinctValues).bits(), 512);
        assert!(ActionFlags::from_bits(256).validate_schema());
        assert!(ActionFlags::from_bits(1024).only_if_exists());
    }

    #[test]
    fn each_action_decodes_from_its_own_bit() {
        for (bit, action) in PRIMARY {
            assert_eq!(action.bit(), bit);
            assert_eq!(ActionFlags::from(action).actions(), vec![action]);
        }
    }

    #[test]
    fn modifiers_are_not_actions() {
        let flags = ActionFlags::from_bits(256 | 1024);
        assert_eq!(flags.primary(), None);
        assert!(flags.actions().is_empty());
    }

    #[test]
    fn priority_follows_bit_order() {
        let flags = ActionFlags::from(Action::AppendArray).with_action(Action::SetValue);
        assert_eq!(flags.primary(), Some(Action::SetValue));
        let flags = ActionFlags::from(Action::SetValue).with_action(Action::DeleteValue);
        assert_eq!(flags.primary(), Some(Action::DeleteValue));
    }

    #[test]
    fn strict_rejects_multiple_actions() {
        let flags = ActionFlags::from_bits(2 | 32 | 256);
        assert!(matches!(
            flags.primary_strict(),
            Err(JsonFileError::InvalidArgument(_))
        ));
        let single = ActionFlags::from_bits(32 | 256);
        assert_eq!(single.primary_strict().unwrap(), Some(Action::AppendArray));
    }

    #[test]
    fn out_of_range_bits_are_ignored() {
        assert!(!ActionFlags::from_bits(u32::MAX).test(40));
    }
}
