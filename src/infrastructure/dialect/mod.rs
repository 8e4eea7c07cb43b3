mod helper_process_refiner;

pub use helper_process_refiner::HelperProcessRefiner;
