pub mod models;
pub mod password;
pub mod services;
pub mod views;

#[cfg(test)]
mod tests;
