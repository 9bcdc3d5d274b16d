mod analyze;
mod daily;
mod helpers;
mod init;
mod log;

pub(crate) use analyze::cmd_analyze;
pub(crate) use daily::cmd_daily;
pub(crate) use init::cmd_init;
pub(crate) use log::cmd_log;
