//! End-to-end tests across the workspace crates.

#[cfg(test)]
mod discovery;
#[cfg(test)]
mod inventory;
