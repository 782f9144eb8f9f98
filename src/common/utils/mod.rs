mod dir;
mod timing;

pub use self::dir::*;
pub use self::timing::*;

/// Check a text field against its maximum length, counted in characters
pub(crate) fn check_length(
    field: &'static str,
    text: &str,
    max: usize,
) -> Result<(), crate::Error> {
    let len = text.chars().count();

    if len > max {
        Err(crate::Error::TextTooLong { field, max, len })
    } else {
        Ok(())
    }
}
