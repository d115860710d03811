// Field tables for the seven NIBRS segment layouts
//
// These are domain constants from the master file layout. Several ranges
// overlap on purpose (property groups run on a stride of 21 while each
// subfield is at most 8 wide, and the vehicle counts at 228..232 fall inside
// the tenth group). Keep them exactly as published.

use super::{FieldSpec, RecordType, Schema};

const ORI: FieldSpec = FieldSpec::scalar("ORI", 16, 25);
const INCIDENT_NUMBER: FieldSpec = FieldSpec::scalar("Incident_Number", 25, 37);

/// Property segments carry ten description/value/recovery groups
const PROPERTY_GROUPS: usize = 10;
const PROPERTY_GROUP_STRIDE: usize = 21;

pub static BATCH_HEADER: Schema = Schema {
    record_type: RecordType::BatchHeader,
    fields: &[
        ORI,
        FieldSpec::scalar("City", 40, 65).trimmed(),
        FieldSpec::scalar("State", 65, 67),
        FieldSpec::scalar("Population", 67, 75),
        FieldSpec::scalar("Year", 8, 12),
    ],
};

pub static ADMINISTRATIVE: Schema = Schema {
    record_type: RecordType::Administrative,
    fields: &[
        ORI,
        INCIDENT_NUMBER,
        FieldSpec::scalar("Incident_Date", 37, 45),
        FieldSpec::scalar("Report_Date_Indicator", 45, 46),
        FieldSpec::scalar("Incident_Hour", 46, 48),
        FieldSpec::scalar("Cleared_Exceptionally", 48, 49),
        FieldSpec::scalar("Exceptional_Clearance_Date", 49, 57),
    ],
};

pub static OFFENSE: Schema = Schema {
    record_type: RecordType::Offense,
    fields: &[
        ORI,
        INCIDENT_NUMBER,
        FieldSpec::scalar("UCR_Offense_Code", 37, 40),
        FieldSpec::scalar("Attempted_Completed", 40, 41),
        FieldSpec::repeated("Offender_Suspected_of_Using", 41, 42, 3, 1),
        FieldSpec::scalar("Location_Type", 44, 46),
        FieldSpec::scalar("Number_of_Premises_Entered", 46, 48),
        FieldSpec::scalar("Method_of_Entry", 48, 49),
        FieldSpec::repeated("Type_Criminal_Activity", 49, 51, 3, 2),
        FieldSpec::repeated("Weapon_Force_Involved", 55, 57, 3, 2),
        FieldSpec::scalar("Bias_Motivation", 61, 63),
    ],
};

pub static PROPERTY: Schema = Schema {
    record_type: RecordType::Property,
    fields: &[
        ORI,
        INCIDENT_NUMBER,
        FieldSpec::scalar("Type_Property_Loss", 37, 38),
        FieldSpec::repeated("Property_Description", 38, 40, PROPERTY_GROUPS, PROPERTY_GROUP_STRIDE),
        FieldSpec::repeated("Property_Value", 40, 48, PROPERTY_GROUPS, PROPERTY_GROUP_STRIDE),
        FieldSpec::repeated("Date_Recovered", 48, 56, PROPERTY_GROUPS, PROPERTY_GROUP_STRIDE),
        FieldSpec::scalar("Number_Stolen_Vehicles", 228, 230),
        FieldSpec::scalar("Number_Recovered_Vehicles", 230, 232),
    ],
};

pub static VICTIM: Schema = Schema {
    record_type: RecordType::Victim,
    fields: &[
        ORI,
        INCIDENT_NUMBER,
        FieldSpec::scalar("Victim_Sequence_Number", 37, 40),
        FieldSpec::repeated("Victim_Connected_UCR_Offense_Code", 40, 43, 10, 3),
        FieldSpec::scalar("Type_of_Victim", 70, 71),
        FieldSpec::scalar("Age_of_Victim", 71, 75),
        FieldSpec::scalar("Sex_of_Victim", 75, 76),
        FieldSpec::scalar("Race_of_Victim", 76, 77),
        FieldSpec::scalar("Ethnicity_of_Victim", 77, 78),
        FieldSpec::scalar("Resident_Status_of_Victim", 78, 79),
        FieldSpec::repeated("Aggravated_Assault_Homicide_Circumstances", 79, 81, 2, 2),
        FieldSpec::scalar("Additional_Justifiable_Homicide_Circumstances", 83, 84),
        FieldSpec::repeated("Type_Injury", 84, 85, 5, 1),
    ],
};

pub static OFFENDER: Schema = Schema {
    record_type: RecordType::Offender,
    fields: &[
        ORI,
        INCIDENT_NUMBER,
        FieldSpec::scalar("Offender_Sequence_Number", 37, 39),
        FieldSpec::scalar("Age_of_Offender", 39, 43),
        FieldSpec::scalar("Sex_of_Offender", 43, 44),
        FieldSpec::scalar("Race_of_Offender", 44, 45),
    ],
};

// 68..70 is unused; age starts at 70.
pub static ARRESTEE: Schema = Schema {
    record_type: RecordType::Arrestee,
    fields: &[
        ORI,
        INCIDENT_NUMBER,
        FieldSpec::scalar("Arrestee_Sequence_Number", 37, 39),
        FieldSpec::scalar("Arrest_Transaction_Number", 39, 51),
        FieldSpec::scalar("Arrest_Date", 51, 59),
        FieldSpec::scalar("Type_of_Arrest", 59, 60),
        FieldSpec::scalar("Multiple_Arrestee_Segments_Indicator", 60, 61),
        FieldSpec::scalar("UCR_Arrest_Offense_Code", 61, 64),
        FieldSpec::repeated("Arrestee_Was_Armed_With", 64, 66, 2, 2),
        FieldSpec::scalar("Age_of_Arrestee", 70, 74),
        FieldSpec::scalar("Sex_of_Arrestee", 74, 75),
        FieldSpec::scalar("Race_of_Arrestee", 75, 76),
        FieldSpec::scalar("Ethnicity_of_Arrestee", 76, 77),
        FieldSpec::scalar("Resident_Status_of_Arrestee", 77, 78),
        FieldSpec::scalar("Disposition_of_Arrestee_Under_18", 78, 79),
    ],
};
