/// Practice analytics
///
/// Pure aggregation over a psychologist's appointments and records. Callers
/// load the rows and resolve patient display names; nothing here touches the
/// database.
use crate::{
    appointment::{AppointmentStatus, DATE_FORMAT},
    db::models::{Appointment, MedicalRecord},
};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Appointment counts per day of week. Every day is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeekdayCounts {
    pub monday: u64,
    pub tuesday: u64,
    pub wednesday: u64,
    pub thursday: u64,
    pub friday: u64,
    pub saturday: u64,
    pub sunday: u64,
}

impl WeekdayCounts {
    fn add(&mut self, day: Weekday) {
        let slot = match day {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentStats {
    pub total: u64,
    pub by_status: BTreeMap<AppointmentStatus, u64>,
    pub by_weekday: WeekdayCounts,
    pub attendance_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStats {
    pub total: u64,
    pub by_patient: BTreeMap<String, u64>,
    pub by_month: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStats {
    pub patient_id: i64,
    pub display_name: String,
    pub total_appointments: u64,
    pub by_status: BTreeMap<AppointmentStatus, u64>,
    pub attendance_rate: f64,
    pub record_count: u64,
}

/// Completed share of finished appointments, as a percentage with two decimals
///
/// Halfway values round to even, so 3.125 reports as 3.12.
pub fn attendance_rate(completed: u64, cancelled: u64) -> f64 {
    let finished = completed + cancelled;
    if finished == 0 {
        return 0.0;
    }

    let rate = completed as f64 / finished as f64 * 100.0;
    (rate * 100.0).round_ties_even() / 100.0
}

fn count_by_status<'a>(appointments: impl IntoIterator<Item = &'a Appointment>) -> BTreeMap<AppointmentStatus, u64> {
    let mut counts = BTreeMap::new();
    for appointment in appointments {
        *counts.entry(appointment.status).or_insert(0) += 1;
    }
    counts
}

fn rate_from_counts(counts: &BTreeMap<AppointmentStatus, u64>) -> f64 {
    let get = |status| counts.get(&status).copied().unwrap_or(0);
    attendance_rate(
        get(AppointmentStatus::Completed),
        get(AppointmentStatus::Cancelled),
    )
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// Totals, status and weekday breakdown, attendance rate
pub fn appointment_stats(appointments: &[Appointment]) -> AppointmentStats {
    let by_status = count_by_status(appointments);

    let mut by_weekday = WeekdayCounts::default();
    for date in appointments.iter().filter_map(|a| parse_date(&a.date)) {
        by_weekday.add(date.weekday());
    }

    AppointmentStats {
        total: appointments.len() as u64,
        attendance_rate: rate_from_counts(&by_status),
        by_status,
        by_weekday,
    }
}

/// Totals, per-patient and per-month breakdown
///
/// `patient_names` maps patient profile id to display name. Records whose
/// patient is missing from it are left out of the per-patient counts.
pub fn record_stats(records: &[MedicalRecord], patient_names: &HashMap<i64, String>) -> RecordStats {
    let mut by_patient = BTreeMap::new();
    let mut by_month = BTreeMap::new();

    for record in records {
        if let Some(name) = patient_names.get(&record.patient_id) {
            *by_patient.entry(name.clone()).or_insert(0) += 1;
        }
        if let Some(date) = parse_date(&record.date) {
            *by_month.entry(date.format("%Y-%m").to_string()).or_insert(0) += 1;
        }
    }

    RecordStats {
        total: records.len() as u64,
        by_patient,
        by_month,
    }
}

/// One entry per patient with at least one appointment, ordered by patient id
pub fn patient_stats(
    appointments: &[Appointment],
    records: &[MedicalRecord],
    patient_names: &HashMap<i64, String>,
) -> Vec<PatientStats> {
    let mut by_patient: BTreeMap<i64, Vec<&Appointment>> = BTreeMap::new();
    for appointment in appointments {
        by_patient.entry(appointment.patient_id).or_default().push(appointment);
    }

    by_patient
        .into_iter()
        .filter_map(|(patient_id, appointments)| {
            let display_name = patient_names.get(&patient_id)?.clone();
            let by_status = count_by_status(appointments.iter().copied());

            Some(PatientStats {
                patient_id,
                display_name,
                total_appointments: appointments.len() as u64,
                attendance_rate: rate_from_counts(&by_status),
                by_status,
                record_count: records.iter().filter(|r| r.patient_id == patient_id).count() as u64,
            })
        })
        .collect()
}
