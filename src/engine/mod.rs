pub mod fetcher;
pub mod resolver;
pub mod selector;
pub mod session;
pub mod submitter;

pub use fetcher::Scope;
pub use selector::Selector;
pub use session::{BatchChoice, Phase, Session, ShownTask};
pub use submitter::SubmitOutcome;
