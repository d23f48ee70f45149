pub mod hospital;

pub use hospital::HospitalApiClient;
