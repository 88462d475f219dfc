use thiserror::Error;

/// Problems with a fixed-width column layout, detected before any byte is read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout has no fields")]
    Empty,

    #[error("field `{field}` has an empty byte range {start}..{end}")]
    EmptyRange {
        field: &'static str,
        start: usize,
        end: usize,
    },

    #[error("field `{0}` appears more than once in the layout")]
    Duplicate(&'static str),

    #[error("layout is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` ends at byte {end}, beyond the {max}-byte line limit")]
    TooWide {
        field: &'static str,
        end: usize,
        max: usize,
    },
}

/// Problems with filter predicates supplied on the command line or in a config file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid range `{0}`: expected MIN-MAX, e.g. 39-42")]
    Malformed(String),

    #[error("range {min}-{max} is empty")]
    Inverted { min: u8, max: u8 },

    #[error("{field} code {code} is not a valid category")]
    UnknownCode { field: &'static str, code: u8 },

    #[error("{field} {value} is listed more than once")]
    Duplicate { field: &'static str, value: String },
}
