#[service(name = "Storage", namespace = "acme.storage")]
trait IStore {
    #[operation]
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        tags: Option<HashMap<String, Vec<i64>>>,
    ) -> (u64, bool);

    #[operation(name = "Fetch")]
    fn get(&self, key: String, token: CancellationToken) -> Streaming<models::Chunk>;

    #[operation]
    fn swap(&self, left: &mut i32, right: Box<[u8]>) -> Future<()>;
}
