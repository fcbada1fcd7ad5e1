#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BotError {
    #[error("Invalid argument for {parameter}: {reason}")]
    InvalidCommandArgument { parameter: String, reason: String },

    #[error("This command can only be used in a server.")]
    GuildOnlyCommand,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("You took too long, try again later.")]
    Timeout,

    #[error("Cancelled.")]
    Cancelled,
}
