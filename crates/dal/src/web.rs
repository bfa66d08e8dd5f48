//! Error-conversion glue between database/driver errors and `anyhow`.
//!
//! Grounded on the teacher's `dal::web` module, which carries a blanket
//! `AnyWay` conversion plus string-literal convenience impls. The teacher
//! reaches for nightly specialization to let those coexist with a generic
//! `std::error::Error` impl; since neither `String` nor `&str` implement
//! `std::error::Error`, the impls never actually overlap, so this version
//! is written as three ordinary (non-specialized) trait impls.

pub trait AnyWay<T> {
    fn anyway(self) -> Result<T, anyhow::Error>;
}

impl<T, E> AnyWay<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn anyway(self) -> Result<T, anyhow::Error> {
        self.map_err(anyhow::Error::from)
    }
}

pub trait AnyWayMsg<T> {
    fn anyway_msg(self, msg: impl Into<String>) -> Result<T, anyhow::Error>;
}

impl<T, E> AnyWayMsg<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn anyway_msg(self, msg: impl Into<String>) -> Result<T, anyhow::Error> {
        self.map_err(|e| anyhow::Error::from(e).context(msg.into()))
    }
}
