//! Stateless, token-driven selection flow (currency → impact → period).

mod machine;
mod token;

pub use machine::{MenuOption, MenuPrompt, Selection, Stage, Step, advance, resume, start};
pub use token::ConversationToken;
