pub mod choice;
pub mod question;

pub use self::choice::Entity as Choice;
pub use self::question::Entity as Question;
