mod generator;
mod routing_table;
mod scenario;
mod simulator;
mod slice_queue;
mod topologies;
