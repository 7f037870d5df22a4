pub mod token;
pub mod user;

pub use token::PgTokenRepository;
pub use user::PgUserRepository;
