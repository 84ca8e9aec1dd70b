pub mod booking;
pub mod conversation;
pub mod dispatch;
pub mod lifecycle;
pub mod queries;
pub mod verification;

pub use booking::BookingService;
pub use conversation::ConversationService;
pub use dispatch::DispatchService;
pub use lifecycle::LifecycleService;
pub use queries::SessionQueryService;
pub use verification::VerificationService;
