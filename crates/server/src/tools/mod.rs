//! Backend tools the server registers on its agent.

mod read_file;
mod weather;

pub use read_file::ReadFileTool;
pub use weather::WeatherTool;
