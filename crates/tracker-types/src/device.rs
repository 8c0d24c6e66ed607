//! Device lifecycle, role and transition types.
//!
//! The device state machine (FABRICADA → HW_APROBADO → SW_VALIDADO →
//! DISTRIBUIDA) is enforced by the tracking contract; these types are
//! read-only mirrors used to decode contract responses and to name the
//! transitions the service can request.

use crate::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a tracked device, as stored on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
	/// Manufactured, awaiting hardware audit.
	Fabricada,
	/// Hardware approved, awaiting software validation.
	HwAprobado,
	/// Software validated, awaiting distribution.
	SwValidado,
	/// Distributed to a school.
	Distribuida,
}

impl DeviceState {
	/// Decodes the numeric state code used by the contract.
	pub fn from_code(code: u8) -> Option<Self> {
		match code {
			0 => Some(Self::Fabricada),
			1 => Some(Self::HwAprobado),
			2 => Some(Self::SwValidado),
			3 => Some(Self::Distribuida),
			_ => None,
		}
	}

	/// Returns the numeric state code used by the contract.
	pub fn code(&self) -> u8 {
		match self {
			Self::Fabricada => 0,
			Self::HwAprobado => 1,
			Self::SwValidado => 2,
			Self::Distribuida => 3,
		}
	}
}

impl fmt::Display for DeviceState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Fabricada => "FABRICADA",
			Self::HwAprobado => "HW_APROBADO",
			Self::SwValidado => "SW_VALIDADO",
			Self::Distribuida => "DISTRIBUIDA",
		};
		write!(f, "{}", name)
	}
}

/// Access-control role granted by the tracking contract.
///
/// Roles gate which state transitions an account may request; the gating
/// itself happens on-chain, the service only reads membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Manufacturer,
	HardwareAuditor,
	SoftwareTechnician,
	School,
}

impl Role {
	/// Returns the numeric role code used by the contract.
	pub fn code(&self) -> u8 {
		match self {
			Self::Manufacturer => 0,
			Self::HardwareAuditor => 1,
			Self::SoftwareTechnician => 2,
			Self::School => 3,
		}
	}
}

impl FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"manufacturer" => Ok(Self::Manufacturer),
			"hardware_auditor" => Ok(Self::HardwareAuditor),
			"software_technician" => Ok(Self::SoftwareTechnician),
			"school" => Ok(Self::School),
			other => Err(format!("Unknown role: {}", other)),
		}
	}
}

/// A state transition request for a tracked device.
///
/// Each variant maps to one write function on the tracking contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeviceTransition {
	/// Registers a newly manufactured device.
	Register { serial: String, model: String },
	/// Marks the hardware audit as passed.
	ApproveHardware { serial: String },
	/// Marks the software validation as passed.
	ValidateSoftware { serial: String },
	/// Records distribution of the device to a school.
	Distribute { serial: String, school: Address },
}

impl DeviceTransition {
	/// Returns the serial number of the device the transition targets.
	pub fn serial(&self) -> &str {
		match self {
			Self::Register { serial, .. }
			| Self::ApproveHardware { serial }
			| Self::ValidateSoftware { serial }
			| Self::Distribute { serial, .. } => serial,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_state_code_roundtrip() {
		for state in [
			DeviceState::Fabricada,
			DeviceState::HwAprobado,
			DeviceState::SwValidado,
			DeviceState::Distribuida,
		] {
			assert_eq!(DeviceState::from_code(state.code()), Some(state));
		}
		assert_eq!(DeviceState::from_code(4), None);
	}

	#[test]
	fn test_transition_deserializes_from_tagged_json() {
		let json = r#"{"action":"approve_hardware","serial":"NB-0042"}"#;
		let transition: DeviceTransition = serde_json::from_str(json).unwrap();
		assert_eq!(
			transition,
			DeviceTransition::ApproveHardware {
				serial: "NB-0042".to_string()
			}
		);
		assert_eq!(transition.serial(), "NB-0042");
	}

	#[test]
	fn test_role_parses_from_path_segment() {
		assert_eq!(
			"hardware_auditor".parse::<Role>(),
			Ok(Role::HardwareAuditor)
		);
		assert!("auditor".parse::<Role>().is_err());
	}
}
