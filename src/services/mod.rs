pub mod acquisition_service;

pub use acquisition_service::AcquisitionService;
