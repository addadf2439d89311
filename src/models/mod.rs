//! One module per table.
//!
//! Every module has the same shape: the record type, typed field handles,
//! relation filters, `UniqueWhere`, `CreateInput`, `UpdateInput` and an
//! `Actions<E>` alias with relation loaders.

pub mod answer_option;
pub mod content_item;
pub mod contribution;
pub mod contribution_statement;
pub mod item_tag;
pub mod quick_signup;
pub mod region;
pub mod tag;
pub mod topic;
pub mod topic_tag;
pub mod user_profile;
