pub mod plot;
pub mod prompt;

pub use plot::{PlotError, PlotLayout, PlotRenderer, PlotStyle};
pub use prompt::{PromptError, Prompter};
