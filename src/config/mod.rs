pub mod load;
pub mod schema;

pub use load::{arm_self_write_suppression, load_or_init, reload, save, take_self_write_suppression};
pub use schema::{
    ActionCommon, AppleScriptAction, Defaults, InsertAction, MacrowhisperConfig, ShellAction,
    ShortcutAction, TriggerLogic, UrlAction, INSERT_AUTO_PASTE, INSERT_NONE, MOVE_TO_DELETE,
    MOVE_TO_NONE,
};
