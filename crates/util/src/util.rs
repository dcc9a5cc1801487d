use std::panic::Location;

pub trait ResultExt<E> {
    type Ok;

    /// Logs the error at `error` level and discards it.
    fn log_err(self) -> Option<Self::Ok>;
    /// Logs the error at `warn` level and discards it.
    fn warn_on_err(self) -> Option<Self::Ok>;
}

impl<T, E> ResultExt<E> for Result<T, E>
where
    E: std::fmt::Debug,
{
    type Ok = T;

    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = Location::caller();
                log::error!("{}:{}: {:?}", caller.file(), caller.line(), error);
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = Location::caller();
                log::warn!("{}:{}: {:?}", caller.file(), caller.line(), error);
                None
            }
        }
    }
}
