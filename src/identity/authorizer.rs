use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::principal::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ManageUsers,
    ManageAppointmentsAll,
    ManageSettings,
    ViewReports,
    ViewOwnAppointments,
    ViewPatientRecords,
    ManageOwnSchedule,
    BookAppointment,
    ViewOwnRecords,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::ManageUsers,
        Capability::ManageAppointmentsAll,
        Capability::ManageSettings,
        Capability::ViewReports,
        Capability::ViewOwnAppointments,
        Capability::ViewPatientRecords,
        Capability::ManageOwnSchedule,
        Capability::BookAppointment,
        Capability::ViewOwnRecords,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Capability::ManageUsers => "manage-users",
            Capability::ManageAppointmentsAll => "manage-appointments-all",
            Capability::ManageSettings => "manage-settings",
            Capability::ViewReports => "view-reports",
            Capability::ViewOwnAppointments => "view-own-appointments",
            Capability::ViewPatientRecords => "view-patient-records",
            Capability::ManageOwnSchedule => "manage-own-schedule",
            Capability::BookAppointment => "book-appointment",
            Capability::ViewOwnRecords => "view-own-records",
        }
    }

    /// Exact tag match only.
    pub fn parse(s: &str) -> Option<Capability> {
        Capability::ALL.into_iter().find(|c| c.tag() == s)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.tag()) }
}

/// One dashboard entry: display label plus the capability it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub capability: Capability,
}

const ADMIN_MENU: &[MenuItem] = &[
    MenuItem { label: "Manage Users", capability: Capability::ManageUsers },
    MenuItem { label: "View All Appointments", capability: Capability::ManageAppointmentsAll },
    MenuItem { label: "System Settings", capability: Capability::ManageSettings },
    MenuItem { label: "View Reports", capability: Capability::ViewReports },
];

const DOCTOR_MENU: &[MenuItem] = &[
    MenuItem { label: "View Appointments", capability: Capability::ViewOwnAppointments },
    MenuItem { label: "View Medical Records", capability: Capability::ViewPatientRecords },
    MenuItem { label: "Manage Schedule", capability: Capability::ManageOwnSchedule },
];

const PATIENT_MENU: &[MenuItem] = &[
    MenuItem { label: "Book Appointment", capability: Capability::BookAppointment },
    MenuItem { label: "View Appointments", capability: Capability::ViewOwnAppointments },
    MenuItem { label: "Medical History", capability: Capability::ViewOwnRecords },
];

/// Fixed role → capability table. Stateless; every lookup is a pure function.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessController;

impl AccessController {
    pub fn permissions_for(role: Role) -> BTreeSet<Capability> {
        Self::menu_for(role).iter().map(|m| m.capability).collect()
    }

    pub fn allows(role: Role, cap: Capability) -> bool {
        Self::menu_for(role).iter().any(|m| m.capability == cap)
    }

    /// String-level gate for front ends holding raw role/capability names.
    /// Unknown role or capability is `false`.
    pub fn is_allowed(role: &str, capability: &str) -> bool {
        let (Some(role), Some(cap)) = (Role::parse(role), Capability::parse(capability)) else {
            return false;
        };
        Self::allows(role, cap)
    }

    pub fn menu_for(role: Role) -> &'static [MenuItem] {
        match role {
            Role::Admin => ADMIN_MENU,
            Role::Doctor => DOCTOR_MENU,
            Role::Patient => PATIENT_MENU,
        }
    }

    pub fn dashboard_path(role: Role) -> &'static str {
        match role {
            Role::Admin => "/admin/dashboard",
            Role::Doctor => "/doctor/dashboard",
            Role::Patient => "/patient/dashboard",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(role: Role) -> Vec<&'static str> {
        AccessController::permissions_for(role).into_iter().map(|c| c.tag()).collect()
    }

    #[test]
    fn fixed_table() {
        let mut admin = tags(Role::Admin);
        admin.sort();
        assert_eq!(admin, vec!["manage-appointments-all", "manage-settings", "manage-users", "view-reports"]);
        let mut doctor = tags(Role::Doctor);
        doctor.sort();
        assert_eq!(doctor, vec!["manage-own-schedule", "view-own-appointments", "view-patient-records"]);
        let mut patient = tags(Role::Patient);
        patient.sort();
        assert_eq!(patient, vec!["book-appointment", "view-own-appointments", "view-own-records"]);
    }

    #[test]
    fn capability_tags_roundtrip_and_serde_agree() {
        for c in Capability::ALL {
            assert_eq!(Capability::parse(c.tag()), Some(c));
            assert_eq!(serde_json::to_value(c).unwrap(), serde_json::json!(c.tag()));
        }
        assert_eq!(Capability::parse("Manage-Users"), None);
    }

    #[test]
    fn menus_only_reference_granted_capabilities() {
        for role in Role::ALL {
            for item in AccessController::menu_for(role) {
                assert!(AccessController::allows(role, item.capability), "{} menu item {}", role, item.label);
            }
        }
        assert_eq!(AccessController::dashboard_path(Role::Doctor), "/doctor/dashboard");
    }
}
