pub mod evaluator;

pub use evaluator::{compile_trigger, evaluate, CompiledTrigger, TriggerContext, TriggerEvalResult};
