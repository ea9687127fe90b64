//! Sample employee generation for the creation form.
//!
//! Produces realistic German-university records. Fields that correlate in
//! real payroll data (job, employee group, contract type, work schedule)
//! are derived from one job pick instead of rolled independently.

use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::shared::dates::WireDate;

const FIRST_NAMES_MALE: &[&str] = &[
    "Alexander", "Andreas", "Christian", "Daniel", "David", "Dennis", "Florian",
    "Frank", "Jan", "Johannes", "Klaus", "Lars", "Markus", "Martin", "Michael",
    "Oliver", "Patrick", "Peter", "Stefan", "Thomas", "Tobias", "Wolfgang",
    "Bernd", "Dieter", "Gerhard", "Günter", "Hans", "Heinz", "Hermann", "Joachim",
    "Jörg", "Jürgen", "Karl", "Manfred", "Norbert", "Rainer", "Reinhard", "Rolf",
    "Uwe", "Volker", "Werner", "Wilfried", "Sebastian", "Matthias", "Benjamin",
];

const FIRST_NAMES_FEMALE: &[&str] = &[
    "Andrea", "Angela", "Anna", "Birgit", "Brigitte", "Christa", "Christine",
    "Claudia", "Doris", "Elisabeth", "Gabi", "Heike", "Ingrid", "Julia", "Karin",
    "Katrin", "Maria", "Martina", "Monika", "Petra", "Regina", "Renate", "Sabine",
    "Sandra", "Silke", "Susanne", "Ute", "Ursula", "Eva", "Helga", "Inge",
    "Margarete", "Marie", "Marianne", "Nicole", "Rita", "Rosemarie", "Ruth",
    "Stefanie", "Tanja", "Vera", "Waltraud", "Gudrun", "Hannelore",
];

const SURNAMES: &[&str] = &[
    "Müller", "Schmidt", "Schneider", "Fischer", "Weber", "Meyer", "Wagner", "Becker",
    "Schulz", "Hoffmann", "Schäfer", "Koch", "Bauer", "Richter", "Klein", "Wolf",
    "Schröder", "Neumann", "Schwarz", "Zimmermann", "Braun", "Krüger", "Hofmann",
    "Hartmann", "Lange", "Schmitt", "Werner", "Schmitz", "Krause", "Meier", "Lehmann",
    "Fuchs", "Kaiser", "Huber", "Mayer", "Hermann", "König", "Walter", "Peters",
    "Schulze", "Heinrich", "Weiß", "Sommer", "Jung", "Möller", "Hahn", "Vogel",
    "Friedrich", "Keller", "Günther", "Frank", "Berger", "Winkler", "Roth", "Beck",
];

const ACADEMIC_TITLES: &[(&str, u32)] = &[
    ("", 60),
    ("Dr.", 25),
    ("Prof. Dr.", 10),
    ("PD Dr.", 4),
    ("Dipl.-Ing.", 1),
];

const JOB_TITLES: &[&str] = &[
    "Bibliothekar", "IT-Administrator", "Professor", "Wissenschaftlicher Mitarbeiter",
    "Tutor", "Sachbearbeiter", "Sekretariat", "Hausmeister", "Laborassistent",
    "Projektleiter", "Systemadministrator", "Forschungsassistent", "Studienberater",
    "Verwaltungsangestellter", "Techniker", "Dozent", "Post-Doc", "Dekan",
];

const LOCATIONS: &[&str] = &[
    "Campus West", "Campus Ost", "Campus Nord", "Campus Süd", "Campus Mitte",
];

const EMPLOYEE_GROUPS: &[(&str, &str)] = &[
    ("Professor", "Professoren"),
    ("Dozent", "Professoren"),
    ("Dekan", "Professoren"),
    ("Post-Doc", "Professoren"),
    ("Wissenschaftlicher Mitarbeiter", "Angestellte"),
    ("Forschungsassistent", "Angestellte"),
    ("IT-Administrator", "Angestellte"),
    ("Projektleiter", "Angestellte"),
    ("Systemadministrator", "Angestellte"),
    ("Sachbearbeiter", "Angestellte"),
    ("Verwaltungsangestellter", "Angestellte"),
    ("Studienberater", "Angestellte"),
    ("Sekretariat", "Angestellte"),
    ("Bibliothekar", "Angestellte"),
    ("Techniker", "Angestellte"),
    ("Tutor", "Hilfskräfte"),
    ("Laborassistent", "Hilfskräfte"),
    ("Hausmeister", "Beamte"),
];

const CONTRACT_TYPES: &[(&str, &str)] = &[
    ("Professor", "unbefristet"),
    ("Dozent", "unbefristet"),
    ("Dekan", "unbefristet"),
    ("IT-Administrator", "unbefristet"),
    ("Sachbearbeiter", "unbefristet"),
    ("Verwaltungsangestellter", "unbefristet"),
    ("Sekretariat", "unbefristet"),
    ("Bibliothekar", "unbefristet"),
    ("Techniker", "unbefristet"),
    ("Hausmeister", "unbefristet"),
    ("Wissenschaftlicher Mitarbeiter", "befristet"),
    ("Post-Doc", "befristet"),
    ("Forschungsassistent", "befristet"),
    ("Projektleiter", "befristet"),
    ("Systemadministrator", "befristet"),
    ("Studienberater", "befristet"),
    ("Tutor", "Werkstudent"),
    ("Laborassistent", "befristet"),
];

const WORK_SCHEDULES: &[(&str, &str)] = &[
    ("Professor", "Vollzeit"),
    ("Dozent", "Vollzeit"),
    ("Dekan", "Vollzeit"),
    ("IT-Administrator", "Vollzeit"),
    ("Sachbearbeiter", "Vollzeit"),
    ("Verwaltungsangestellter", "Vollzeit"),
    ("Sekretariat", "Vollzeit"),
    ("Bibliothekar", "Vollzeit"),
    ("Techniker", "Vollzeit"),
    ("Hausmeister", "Vollzeit"),
    ("Wissenschaftlicher Mitarbeiter", "Vollzeit"),
    ("Post-Doc", "Vollzeit"),
    ("Forschungsassistent", "Teilzeit"),
    ("Projektleiter", "Vollzeit"),
    ("Systemadministrator", "Vollzeit"),
    ("Studienberater", "Teilzeit"),
    ("Tutor", "Teilzeit"),
    ("Laborassistent", "Teilzeit"),
];

const EMAIL_DOMAINS: &[&str] = &["@hochschule.de", "@uni.de", "@campus.de"];
const PHONE_PREFIXES: &[&str] = &[
    "+49 30", "+49 40", "+49 89", "030", "040", "089", "0221", "0211",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SampleEmployee {
    pub firstname: String,
    pub lastname: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub orgeh: String,
    pub job: String,
    pub plans: String,
    pub location: String,
    pub begda: WireDate,
    pub endda: WireDate,
    pub contract_type: String,
    pub workschedule: String,
    pub birthdate: WireDate,
    pub gender: String,
    pub natio: String,
    pub persg: String,
    pub persk: String,
}

fn weighted_choice<'a, R: Rng>(rng: &mut R, items: &[(&'a str, u32)]) -> &'a str {
    let total: u32 = items.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (value, weight) in items {
        if roll < *weight {
            return value;
        }
        roll -= weight;
    }
    items[0].0
}

fn lookup<'a>(table: &[(&str, &'a str)], key: &str, default: &'a str) -> &'a str {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or(default)
}

fn random_date<R: Rng>(rng: &mut R, start_year: i32, end_year: i32) -> WireDate {
    let start = NaiveDate::from_ymd_opt(start_year, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(end_year, 12, 31).unwrap();
    let span = (end - start).num_days();
    WireDate(start + Duration::days(rng.gen_range(0..=span)))
}

fn transliterate(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .flat_map(|c| match c {
            'ä' => "ae".chars().collect::<Vec<_>>(),
            'ö' => "oe".chars().collect(),
            'ü' => "ue".chars().collect(),
            'ß' => "ss".chars().collect(),
            other => vec![other],
        })
        .collect()
}

fn sample_email<R: Rng>(rng: &mut R, firstname: &str, lastname: &str) -> String {
    let separator = *[".", "-", "_"].choose(rng).unwrap();
    let domain = *EMAIL_DOMAINS.choose(rng).unwrap();
    format!(
        "{}{separator}{}{domain}",
        transliterate(firstname),
        transliterate(lastname)
    )
}

fn sample_phone<R: Rng>(rng: &mut R) -> String {
    let prefix = *PHONE_PREFIXES.choose(rng).unwrap();
    let number: u32 = rng.gen_range(10_000_000..100_000_000);
    let digits = number.to_string();
    format!("{prefix} {} {}", &digits[..4], &digits[4..])
}

fn sample_position_id<R: Rng>(rng: &mut R) -> String {
    format!("PL{}", rng.gen_range(1000..10_000))
}

/// Generates one coherent record. `orgs` is a list of (objid, stext) pairs
/// the record may be assigned to; with no organizations loaded the record
/// falls back to orgeh "1001".
pub fn sample_employee<R: Rng>(rng: &mut R, orgs: &[(String, String)]) -> SampleEmployee {
    let gender = *["M", "F", "D"].choose(rng).unwrap();
    let name_pool = match gender {
        "M" => FIRST_NAMES_MALE,
        "F" => FIRST_NAMES_FEMALE,
        _ => *[FIRST_NAMES_MALE, FIRST_NAMES_FEMALE].choose(rng).unwrap(),
    };
    let firstname = (*name_pool.choose(rng).unwrap()).to_string();
    let lastname = (*SURNAMES.choose(rng).unwrap()).to_string();

    let title = weighted_choice(rng, ACADEMIC_TITLES).to_string();

    let job = *JOB_TITLES.choose(rng).unwrap();
    let persg = lookup(EMPLOYEE_GROUPS, job, "Angestellte");
    let contract_type = lookup(CONTRACT_TYPES, job, "unbefristet");
    let workschedule = lookup(WORK_SCHEDULES, job, "Vollzeit");

    let orgeh = orgs
        .choose(rng)
        .map(|(objid, _)| objid.clone())
        .unwrap_or_else(|| "1001".to_string());

    let birthdate = random_date(rng, 1960, 2000);
    let begda = random_date(rng, 2020, 2024);
    let endda = match contract_type {
        "unbefristet" => "31.12.2099".parse().unwrap(),
        "Werkstudent" => random_date(rng, 2024, 2026),
        _ => random_date(rng, 2025, 2027),
    };

    let email = sample_email(rng, &firstname, &lastname);
    let phone = sample_phone(rng);
    let plans = sample_position_id(rng);

    let persk = match persg {
        "Professoren" => "Wissenschaftlich".to_string(),
        "Hilfskräfte" => {
            if job.contains("Tutor") {
                "Wissenschaftlich".to_string()
            } else {
                "Nicht-Wissenschaftlich".to_string()
            }
        }
        _ => (*["Vollzeit", "Teilzeit"].choose(rng).unwrap()).to_string(),
    };

    SampleEmployee {
        firstname,
        lastname,
        title,
        email,
        phone,
        orgeh,
        job: job.to_string(),
        plans,
        location: (*LOCATIONS.choose(rng).unwrap()).to_string(),
        begda,
        endda,
        contract_type: contract_type.to_string(),
        workschedule: workschedule.to_string(),
        birthdate,
        gender: gender.to_string(),
        natio: "DE".to_string(),
        persg: persg.to_string(),
        persk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn orgs() -> Vec<(String, String)> {
        vec![
            ("1000".to_string(), "Hochschulleitung".to_string()),
            ("1100".to_string(), "Fakultät Informatik".to_string()),
        ]
    }

    #[test]
    fn same_seed_yields_same_employee() {
        let a = sample_employee(&mut StdRng::seed_from_u64(42), &orgs());
        let b = sample_employee(&mut StdRng::seed_from_u64(42), &orgs());
        assert_eq!(a, b);
    }

    #[test]
    fn job_drives_group_contract_and_schedule() {
        assert_eq!(lookup(EMPLOYEE_GROUPS, "Professor", "Angestellte"), "Professoren");
        assert_eq!(lookup(CONTRACT_TYPES, "Professor", "befristet"), "unbefristet");
        assert_eq!(lookup(WORK_SCHEDULES, "Professor", "Teilzeit"), "Vollzeit");
        assert_eq!(lookup(CONTRACT_TYPES, "Tutor", "unbefristet"), "Werkstudent");
        assert_eq!(lookup(EMPLOYEE_GROUPS, "Hausmeister", "Angestellte"), "Beamte");
    }

    #[test]
    fn permanent_contracts_end_in_2099() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let e = sample_employee(&mut rng, &orgs());
            if e.contract_type == "unbefristet" {
                assert_eq!(e.endda.to_string(), "31.12.2099");
            }
            assert_eq!(e.natio, "DE");
            assert!(orgs().iter().any(|(objid, _)| *objid == e.orgeh));
        }
    }

    #[test]
    fn falls_back_to_default_org_when_none_loaded() {
        let e = sample_employee(&mut StdRng::seed_from_u64(1), &[]);
        assert_eq!(e.orgeh, "1001");
    }

    #[test]
    fn emails_transliterate_umlauts() {
        assert_eq!(transliterate("Müller"), "mueller");
        assert_eq!(transliterate("Weiß"), "weiss");
        assert_eq!(transliterate("Jörg"), "joerg");
        let mut rng = StdRng::seed_from_u64(3);
        let email = sample_email(&mut rng, "Jürgen", "Schäfer");
        assert!(email.starts_with("juergen"));
        assert!(email.contains("schaefer"));
    }

    #[test]
    fn weighted_choice_respects_zero_remainder_edge() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let title = weighted_choice(&mut rng, ACADEMIC_TITLES);
            assert!(ACADEMIC_TITLES.iter().any(|(v, _)| *v == title));
        }
    }
}
