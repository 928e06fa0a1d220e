trait IBase {
    #[operation]
    fn ping(&self);
}

/// Generic repository.
#[service]
trait IRepo<T: Clone>: IBase + Send + Sync {
    #[operation]
    fn find(&self, id: u32) -> Option<T>;

    #[operation]
    fn convert<U>(&self, value: T) -> Vec<U>;
}

struct PersonRepo;

impl IRepo<crate::models::Person> for PersonRepo {}
