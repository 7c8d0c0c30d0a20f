//! Email, phone, address, tax-id, and name validators. Each validator takes
//! its external collaborators (DNS, geocoder, OTP provider, VAT registry,
//! disposable-domain source, postal reference table) as injected trait
//! objects rather than reaching out to the network itself — see
//! [`collaborators`].

pub mod address;
pub mod collaborators;
pub mod email;
pub mod name;
pub mod phone;
pub mod taxid;

pub use address::{AddressInput, AddressValidationResult, AddressValidator, NormalizedAddress};
pub use email::{EmailValidationResult, EmailValidator};
pub use name::{validate as validate_name, NameValidationResult};
pub use phone::{OtpCheckResult, PhoneValidationResult, PhoneValidator};
pub use taxid::{TaxIdInput, TaxIdType, TaxIdValidationResult, TaxIdValidator};
