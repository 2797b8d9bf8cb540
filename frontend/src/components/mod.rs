pub mod bin_details;
pub mod bin_list;
pub mod chart_plotly;
pub mod chat;
mod fetch;
