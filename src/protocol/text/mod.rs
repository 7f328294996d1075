mod ping;
mod query;
mod quit;
mod reset;
mod row;

pub(crate) use ping::ComPing;
pub(crate) use query::ComQuery;
pub(crate) use quit::ComQuit;
pub(crate) use reset::ComResetConnection;
pub(crate) use row::TextRow;
