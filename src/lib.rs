pub mod app;
pub mod net;
pub mod queue;
pub mod sim;
pub mod slice;
pub mod topo;

#[cfg(test)]
mod test;
