//! Medical disciplines, loosely following the German specialist training regulations
//! (Muster-Weiterbildungsordnung 2018).

coded_enum! {
    /// A medical specialty, stored by code (e.g. `inner_medicine`) and shown by its German name.
    Discipline ("discipline") {
        GeneralPractice => "general_practice", "Allgemeinmedizin",
        Anesthesia => "anesthesia", "Anästhesiologie",
        Anatomy => "anatomy", "Anatomie",
        OccupationalMedicine => "occupational_medicine", "Arbeitsmedizin",
        Opthalmology => "opthalmology", "Augenheilkunde",
        Biochemistry => "biochemistry", "Biochemie",
        Surgery => "surgery", "Chirurgie",
        Gynecology => "gynecology", "Frauenheilkunde und Geburtshilfe",
        Ent => "ent", "Hals-/Nasen-/Ohrenheilkunde",
        Dermatology => "dermatology", "Haut- und Geschlechtskrankheiten",
        HumanGenetics => "human_genetics", "Humangenetik",
        HygieneAndEnvironmentalMedicine => "hygiene_and_environmental_medicine", "Hygiene- und Umweltmedizin",
        InnerMedicine => "inner_medicine", "Innere Medizin",
        Paediatry => "paediatry", "Kinder- und Jugendmedizin",
        PaediatricPsychiatryAndPsychotherapy => "paediatric_psychiatry_and_psychotherapy", "Kinder- und Jugendpsychiatrie und -psychotherapie",
        LaboratoryMedicine => "laboratory_medicine", "Laboratoriumsmedizin",
        MicrobiologyVirologyAndInfectionEpidemology => "microbiology_virology_and_infection_epidemology", "Mikrobiologie, Virologie und Infektionsepidemiologie",
        MaxillofacialSurgery => "maxillofacial_surgery", "Mund-/Kiefer-/Gesichtschirurgie",
        NeuroSurgery => "neuro_surgery", "Neurochirurgie",
        Neurology => "neurology", "Neurologie",
        NuclearMedicine => "nuclear_medicine", "Nuklearmedizin",
        PublicHealthSystem => "public_health_system", "Öffentliches Gesundheitswesen",
        Pathology => "pathology", "Pathologie",
        Pharmacology => "pharmacology", "Pharmakologie",
        PhoniatricsAndPaediatricAudiology => "phoniatrics_and_paediatric_audiology", "Phoniatrie und Pädaudiologie",
        PhysicalMedicineAndRehabilitation => "physical_medicine_and_rehabilitation", "Physikalische und rehabilitative Medizin",
        Physiology => "physiology", "Physiologie",
        PsychiatryAndPsychotherapy => "psychiatry_and_psychotherapy", "Psychiatrie und Psychotherapie",
        PsychosomaticMedicineAndPsychotherapy => "psychosomatic_medicine_and_psychotherapy", "Psychosomatische Medizin und Psychotherapie",
        Radiology => "radiology", "Radiologie",
        ForensicMedicine => "forensic_medicine", "Rechtsmedizin",
        Radiotherapy => "radiotherapy", "Strahlentherapie",
        TransfusionMedicine => "transfusion_medicine", "Transfusionsmedizin",
        Urology => "urology", "Urologie",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_and_match_serde() {
        let mut codes: Vec<&str> = Discipline::ALL.iter().map(|d| d.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Discipline::ALL.len());

        for discipline in Discipline::ALL {
            let yaml = serde_yaml::to_string(&discipline).unwrap();
            assert_eq!(yaml.trim(), discipline.code());
        }
    }

    #[test]
    fn parses_from_code() {
        assert_eq!(
            "inner_medicine".parse::<Discipline>().unwrap(),
            Discipline::InnerMedicine
        );
        assert_eq!(Discipline::Opthalmology.label(), "Augenheilkunde");
        assert!("cardiology".parse::<Discipline>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for &discipline in Discipline::ALL {
            assert_eq!(discipline.to_string().parse::<Discipline>().unwrap(), discipline);
        }
        assert_eq!(Discipline::Ent.to_string(), "ent");
    }
}
