pub mod args;
pub mod call;
pub mod history;
pub mod login;

pub use args::{
    CallCliArgs, Cli, CliCommand, DirectionArg, HistoryCliArgs, IncomingCliArgs, LoginCliArgs,
};
pub use call::{handle_call_command, handle_incoming_command};
pub use history::{format_timestamp, handle_history_command, print_history};
pub use login::{
    handle_login_command, handle_logout_command, handle_whoami_command, interactive_login,
};
