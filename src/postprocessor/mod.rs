//! Legacy postprocessor routing, independent of the dispatch table.

pub mod router;

pub use router::{
    postprocessor, FnPostprocessor, Postprocessor, PostprocessorKind, PostprocessorRouter,
};
