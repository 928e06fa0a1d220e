/// A simple echo service.
#[service]
pub trait Echo {
    /// Echoes the message back to the caller.
    #[operation]
    async fn echo(&self, message: String) -> String;

    fn local_only(&self) -> bool;
}
