//! Context tags of the Glow element shapes built by this crate
//!
//! Only the properties the builders and views touch are listed here.

use ember_ber::Tag;

/// Outer tag of a root document
pub const ROOT: Tag = Tag::application(true, 0);

/// Tag of every item in an element collection
pub const COLLECTION_ITEM: Tag = Tag::context(true, 0);

/// Properties shared by every tree element
pub mod element {
    use ember_ber::Tag;

    /// Local number of a numbered element
    pub const NUMBER: Tag = Tag::context(true, 0);
    /// Full path of a qualified element
    pub const PATH: Tag = Tag::context(true, 0);
    pub const CONTENTS: Tag = Tag::context(true, 1);
    pub const CHILDREN: Tag = Tag::context(true, 2);
}

/// Node contents
pub mod node {
    use ember_ber::Tag;

    pub const IDENTIFIER: Tag = Tag::context(true, 0);
    pub const DESCRIPTION: Tag = Tag::context(true, 1);
    pub const IS_ROOT: Tag = Tag::context(true, 2);
    pub const IS_ONLINE: Tag = Tag::context(true, 3);
    pub const SCHEMA_IDENTIFIERS: Tag = Tag::context(true, 4);
    pub const TEMPLATE_REFERENCE: Tag = Tag::context(true, 5);
}

/// Parameter contents
pub mod parameter {
    use ember_ber::Tag;

    pub const IDENTIFIER: Tag = Tag::context(true, 0);
    pub const DESCRIPTION: Tag = Tag::context(true, 1);
    pub const VALUE: Tag = Tag::context(true, 2);
    pub const MINIMUM: Tag = Tag::context(true, 3);
    pub const MAXIMUM: Tag = Tag::context(true, 4);
    pub const ACCESS: Tag = Tag::context(true, 5);
    pub const FORMAT: Tag = Tag::context(true, 6);
    pub const ENUMERATION: Tag = Tag::context(true, 7);
    pub const FACTOR: Tag = Tag::context(true, 8);
    pub const IS_ONLINE: Tag = Tag::context(true, 9);
    pub const FORMULA: Tag = Tag::context(true, 10);
    pub const STEP: Tag = Tag::context(true, 11);
    pub const DEFAULT: Tag = Tag::context(true, 12);
    pub const TYPE: Tag = Tag::context(true, 13);
    pub const STREAM_IDENTIFIER: Tag = Tag::context(true, 14);
}

/// Command properties
pub mod command {
    use ember_ber::Tag;

    pub const NUMBER: Tag = Tag::context(true, 0);
    pub const DIR_FIELD_MASK: Tag = Tag::context(true, 1);
}
