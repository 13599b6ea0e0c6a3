pub mod matching;
pub mod rect;
pub mod swaparc;
pub mod window;

pub use matching::{
    ApplicationIdentifier, CompiledRules, MatchingRule, MatchingStrategy, RuleError,
    WindowMatcher, WorkspaceMatchingRule,
};
pub use rect::Rect;
pub use swaparc::SwapArc;
pub use window::{WindowDescriptor, WindowHandle};
