//! Glow application types and enumerations

use ember_ber::{Tag, TagClass};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Glow element type, identified by its application tag number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlowType {
    Root = 0,
    Parameter = 1,
    Command = 2,
    Node = 3,
    ElementCollection = 4,
    StreamEntry = 5,
    StreamCollection = 6,
    StringIntegerPair = 7,
    StringIntegerCollection = 8,
    QualifiedParameter = 9,
    QualifiedNode = 10,
    RootElementCollection = 11,
    StreamDescription = 12,
    Matrix = 13,
    Target = 14,
    Source = 15,
    Connection = 16,
    QualifiedMatrix = 17,
    Label = 18,
    Function = 19,
    QualifiedFunction = 20,
    TupleItemDescription = 21,
    Invocation = 22,
    InvocationResult = 23,
    Template = 24,
    QualifiedTemplate = 25,
}

impl GlowType {
    /// Every Glow type, in tag number order
    pub const ALL: [GlowType; 26] = [
        GlowType::Root,
        GlowType::Parameter,
        GlowType::Command,
        GlowType::Node,
        GlowType::ElementCollection,
        GlowType::StreamEntry,
        GlowType::StreamCollection,
        GlowType::StringIntegerPair,
        GlowType::StringIntegerCollection,
        GlowType::QualifiedParameter,
        GlowType::QualifiedNode,
        GlowType::RootElementCollection,
        GlowType::StreamDescription,
        GlowType::Matrix,
        GlowType::Target,
        GlowType::Source,
        GlowType::Connection,
        GlowType::QualifiedMatrix,
        GlowType::Label,
        GlowType::Function,
        GlowType::QualifiedFunction,
        GlowType::TupleItemDescription,
        GlowType::Invocation,
        GlowType::InvocationResult,
        GlowType::Template,
        GlowType::QualifiedTemplate,
    ];

    /// Application tag number
    pub fn number(self) -> u32 {
        self as u32
    }

    pub fn from_number(number: u32) -> Option<Self> {
        Self::ALL.get(number as usize).copied()
    }

    /// Constructed application tag of this type
    pub fn tag(self) -> Tag {
        Tag::application(true, self.number())
    }

    /// Look up the Glow type of an application type tag
    pub fn from_tag(tag: Tag) -> Option<Self> {
        if tag.class() != TagClass::Application {
            return None;
        }
        Self::from_number(tag.number())
    }

    /// Check whether elements of this type carry a full path instead of a
    /// local number
    pub fn is_qualified(self) -> bool {
        matches!(
            self,
            GlowType::QualifiedParameter
                | GlowType::QualifiedNode
                | GlowType::QualifiedMatrix
                | GlowType::QualifiedFunction
                | GlowType::QualifiedTemplate
        )
    }

    /// Check whether this type is an addressable tree element
    pub fn is_element(self) -> bool {
        self.is_qualified()
            || matches!(
                self,
                GlowType::Parameter
                    | GlowType::Node
                    | GlowType::Matrix
                    | GlowType::Function
                    | GlowType::Template
            )
    }

    /// Qualified variant of a numbered element type
    pub fn qualified(self) -> Option<Self> {
        match self {
            GlowType::Parameter => Some(GlowType::QualifiedParameter),
            GlowType::Node => Some(GlowType::QualifiedNode),
            GlowType::Matrix => Some(GlowType::QualifiedMatrix),
            GlowType::Function => Some(GlowType::QualifiedFunction),
            GlowType::Template => Some(GlowType::QualifiedTemplate),
            _ => None,
        }
    }

    /// Numbered variant of a qualified element type
    pub fn unqualified(self) -> Self {
        match self {
            GlowType::QualifiedParameter => GlowType::Parameter,
            GlowType::QualifiedNode => GlowType::Node,
            GlowType::QualifiedMatrix => GlowType::Matrix,
            GlowType::QualifiedFunction => GlowType::Function,
            GlowType::QualifiedTemplate => GlowType::Template,
            other => other,
        }
    }
}

impl fmt::Display for GlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Command number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    Subscribe = 30,
    Unsubscribe = 31,
    GetDirectory = 32,
    Invoke = 33,
}

impl CommandType {
    pub fn to_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            30 => Some(CommandType::Subscribe),
            31 => Some(CommandType::Unsubscribe),
            32 => Some(CommandType::GetDirectory),
            33 => Some(CommandType::Invoke),
            _ => None,
        }
    }
}

/// Field selection of a GetDirectory command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldFlags {
    Sparse = -2,
    All = -1,
    Default = 0,
    Identifier = 1,
    Description = 2,
    Tree = 3,
    Value = 4,
    Connections = 5,
}

impl FieldFlags {
    pub fn to_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            -2 => Some(FieldFlags::Sparse),
            -1 => Some(FieldFlags::All),
            0 => Some(FieldFlags::Default),
            1 => Some(FieldFlags::Identifier),
            2 => Some(FieldFlags::Description),
            3 => Some(FieldFlags::Tree),
            4 => Some(FieldFlags::Value),
            5 => Some(FieldFlags::Connections),
            _ => None,
        }
    }
}

/// Declared type of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    None = 0,
    Integer = 1,
    Real = 2,
    String = 3,
    Boolean = 4,
    Trigger = 5,
    Enum = 6,
    Octets = 7,
}

impl ParameterType {
    pub fn to_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(ParameterType::None),
            1 => Some(ParameterType::Integer),
            2 => Some(ParameterType::Real),
            3 => Some(ParameterType::String),
            4 => Some(ParameterType::Boolean),
            5 => Some(ParameterType::Trigger),
            6 => Some(ParameterType::Enum),
            7 => Some(ParameterType::Octets),
            _ => None,
        }
    }
}

/// Access rights of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterAccess {
    None = 0,
    Read = 1,
    Write = 2,
    ReadWrite = 3,
}

impl ParameterAccess {
    pub fn to_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(ParameterAccess::None),
            1 => Some(ParameterAccess::Read),
            2 => Some(ParameterAccess::Write),
            3 => Some(ParameterAccess::ReadWrite),
            _ => None,
        }
    }

    pub fn can_read(self) -> bool {
        matches!(self, ParameterAccess::Read | ParameterAccess::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, ParameterAccess::Write | ParameterAccess::ReadWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glow_type_numbers() {
        for (i, glow_type) in GlowType::ALL.iter().enumerate() {
            assert_eq!(glow_type.number() as usize, i);
            assert_eq!(GlowType::from_number(i as u32), Some(*glow_type));
        }
        assert_eq!(GlowType::from_number(26), None);
        assert_eq!(GlowType::from_tag(Tag::application(true, 3)), Some(GlowType::Node));
        assert_eq!(GlowType::from_tag(Tag::context(true, 3)), None);
    }

    #[test]
    fn test_qualified_variants() {
        assert_eq!(GlowType::Node.qualified(), Some(GlowType::QualifiedNode));
        assert_eq!(GlowType::QualifiedParameter.unqualified(), GlowType::Parameter);
        assert!(GlowType::QualifiedMatrix.is_qualified());
        assert!(GlowType::Template.is_element());
        assert!(!GlowType::Command.is_element());
        assert_eq!(GlowType::Command.qualified(), None);
    }

    #[test]
    fn test_enum_values() {
        assert_eq!(CommandType::GetDirectory.to_i64(), 32);
        assert_eq!(CommandType::from_i64(30), Some(CommandType::Subscribe));
        assert_eq!(FieldFlags::from_i64(-1), Some(FieldFlags::All));
        assert_eq!(FieldFlags::Sparse.to_i64(), -2);
        assert_eq!(ParameterType::from_i64(6), Some(ParameterType::Enum));
        assert!(ParameterAccess::ReadWrite.can_write());
        assert!(!ParameterAccess::Write.can_read());
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&GlowType::QualifiedNode).unwrap();
        assert_eq!(json, "\"QualifiedNode\"");
    }
}
