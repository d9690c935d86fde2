// crates/fishsoop-core/src/message.rs

use serde::Serialize;

use crate::error::NotifyError;
use crate::record::{attrs, Programme, SensorRecord};
use crate::stats::DeploymentStats;
use crate::templates::{RenderedMessage, TemplateSet, BODY_STYLE};

const SUBJECT_TEMPLATE: &str = "{{title_name}} Serial Number {{moana_serial_number}} Temperature and Depth Data for {{vessel_name}} from {{time_min}} to {{time_max}}";

const HTML_TEMPLATE: &str = r#"<html>
<head>
{{{style}}}
</head>
<body>

<table>
    <thead><tr><th>Vessel Information</th></tr></thead>
    <tbody>
    <tr><td style="font-weight: bold;">Vessel name: </td><td>{{vessel_name}}</td></tr>
    <tr><td style="font-weight: bold;">Time Range: </td><td> {{time_min}} - {{time_max}}</td></tr>
    <tr><td style="font-weight: bold;">Vessel email: </td><td> {{vessel_email}}</td></tr>
    </tbody>
</table>
<br/>
<table>
    <thead><tr><th>Data Summary</th></tr></thead>
    <tbody>
    <tr><td>  </td><td style="font-weight: bold;">Maximum</td><td style="font-weight: bold;">Minimum</td><td style="font-weight: bold;">Average</td></tr>
    <tr><td style="font-weight: bold;">Temperature</td><td>{{temp_max}}&#176;C</td><td>{{temp_min}}&#176;C</td><td>{{temp_avg}}&#176;C</td></tr>
    <tr><td style="font-weight: bold;">Depth</td><td>{{depth_tmax}} m</td><td>{{depth_tmin}} m</td><td>{{depth_avg}} m</td></tr>
    </tbody>
</table>
<p>Maximum depth of this sensor deployment: {{depth_max}} m</p>
<p> Note that depths in the Data Summary are the depths of the maximum and minimum temperature values, and the average depth of the deployment. </p>

<p>Please see attached the {{sensor_name}} temperature sensor data for {{vessel_name}}. Data quality-control and
visualisation provided automatically by The Coastal and Regional Oceanography Lab at UNSW.</p>

<p>{{data_statement}}</p>

<p>If you have any questions or comments, please contact {{contact_email}}. This is an automatic email
that is generated within 24 hours of data transmission from {{vessel_name}}.</p>

<p><small>The information contained in this email message (including any attachments) is STRICTLY CONFIDENTIAL. If you are not the
intended recipient then please notify {{contact_email}} immediately and then delete the e-mail. Anyone other than the intended recipient must not use,
disclose, copy or distribute this message, the information in it, or any attachments.</small></p>

</body>
</html>
"#;

const TEXT_TEMPLATE: &str = "Vessel name: {{vessel_name}}
Time Range: {{time_min}} - {{time_max}}
Deployment Temperature Summary:
Temperature Range: {{temp_min}} degC - {{temp_max}} degC
The minimum temperature occurred at a depth of {{depth_tmin}} m and the maximum temperature at {{depth_tmax}} m.
Temperature Average: {{temp_avg}} degC
Deployment Depth Summary:
Maximum depth: {{depth_max}} m
Depth Average: {{depth_avg}} m
Note that depths in the Data Summary are the depths of the maximum and minimum temperature values, and the average depth of the deployment.
Please see attached the {{sensor_name}} temperature sensor data for {{vessel_name}}. Data quality-control and visualisation provided automatically by The Coastal and Regional Oceanography Lab at UNSW.
{{data_statement}}
If you have any questions or comments, please contact {{contact_email}}. This is an automatic email that is generated within 24 hours of data transmission from {{vessel_name}}.
The information contained in this email message (including any attachments) is STRICTLY CONFIDENTIAL. If you are not the intended recipient then please notify {{contact_email}} immediately and then delete the e-mail. Anyone other than the intended recipient must not use, disclose, copy or distribute this message, the information in it, or any attachments.
Errors: {{email_error}}
";

const DEFAULT_STATEMENT: &str = "Moana sensor and deck unit provided by the FishSOOP Project.  The FishSOOP Project is funded by the FRDC and IMOS.";

const FISHSOOP_STATEMENT: &str = "Temperature sensor and deck unit funded by the Integrated Marine Observing System (IMOS) \
as part of Fisheries Research and Development Corporation (FRDC) project number 2022-07. \
Data collected as part of FishSOOP: Oceanographic data collection on commercial fishing vessels; a partnership \
between Fishwell Consulting (Fishwell) the University of New South Wales (UNSW) and the Integrated \
Marine Observing System (IMOS). The project is co-funded by FRDC under project number 2022-07 and IMOS through \
the Commonwealth Government's National Collaborative Research Infrastructure Strategy (NCRIS).";

pub const FALLBACK_RECIPIENT_WARNING: &str = "No recipients found, sending to default email.";

const VESSEL_ATTRIBUTES: [&str; 4] = [
    attrs::VESSEL_NAME,
    attrs::VESSEL_ID,
    attrs::MOANA_SERIAL_NUMBER,
    attrs::PROGRAMME_NAME,
];

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Wording that differs between programmes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammeCopy {
    pub sensor_name: &'static str,
    pub title_name: &'static str,
    pub contact_email: &'static str,
    pub data_statement: &'static str,
}

impl ProgrammeCopy {
    pub fn for_programme(programme: &Programme) -> Self {
        match programme {
            Programme::FishSoop => Self {
                sensor_name: "Moana",
                title_name: "Moana",
                contact_email: "FishSOOP@unsw.edu.au",
                data_statement: FISHSOOP_STATEMENT,
            },
            Programme::Other => Self {
                sensor_name: "Moana",
                title_name: "Moana",
                contact_email: "fishsoop@unsw.edu.au",
                data_statement: DEFAULT_STATEMENT,
            },
        }
    }
}

/// Every value the notification templates reference.
#[derive(Debug, Clone, Serialize)]
pub struct MessageContext {
    pub style: &'static str,
    pub sensor_name: &'static str,
    pub title_name: &'static str,
    pub contact_email: &'static str,
    pub data_statement: &'static str,
    pub vessel_name: String,
    pub vessel_id: String,
    pub moana_serial_number: String,
    pub programme_name: String,
    pub vessel_email: String,
    pub time_min: String,
    pub time_max: String,
    pub temp_min: String,
    pub temp_max: String,
    pub temp_avg: String,
    pub depth_tmin: String,
    pub depth_tmax: String,
    pub depth_avg: String,
    pub depth_min: String,
    pub depth_max: String,
    pub email_error: String,
}

impl MessageContext {
    pub fn from_record(record: &SensorRecord) -> Result<Self, NotifyError> {
        let copy = ProgrammeCopy::for_programme(&record.programme());
        let vessel_email = record
            .attribute(attrs::VESSEL_EMAIL)
            .ok_or_else(|| NotifyError::TemplateContext("record has no vessel_email attribute".into()))?
            .to_string();
        let (time_min, time_max) = record
            .time_range()
            .ok_or_else(|| NotifyError::TemplateContext("record has no samples".into()))?;
        let stats = DeploymentStats::from_samples(&record.samples).ok_or_else(|| {
            NotifyError::TemplateContext("record has no usable temperatures".into())
        })?;

        let [vessel_name, vessel_id, moana_serial_number, programme_name] =
            VESSEL_ATTRIBUTES.map(|name| vessel_attribute(record, name));

        Ok(Self {
            style: BODY_STYLE,
            sensor_name: copy.sensor_name,
            title_name: copy.title_name,
            contact_email: copy.contact_email,
            data_statement: copy.data_statement,
            vessel_name,
            vessel_id,
            moana_serial_number,
            programme_name,
            vessel_email,
            time_min: time_min.format(TIME_FORMAT).to_string(),
            time_max: time_max.format(TIME_FORMAT).to_string(),
            temp_min: format!("{:.2}", stats.temp_min),
            temp_max: format!("{:.2}", stats.temp_max),
            temp_avg: format!("{:.2}", stats.temp_avg),
            depth_tmin: format!("{:.1}", stats.depth_at_temp_min),
            depth_tmax: format!("{:.1}", stats.depth_at_temp_max),
            depth_avg: format!("{:.1}", stats.depth_avg),
            depth_min: format!("{:.1}", stats.depth_min),
            depth_max: format!("{:.1}", stats.depth_max),
            email_error: "None".to_string(),
        })
    }
}

fn vessel_attribute(record: &SensorRecord, name: &str) -> String {
    match record.attribute(name) {
        Some(value) if !value.is_empty() && value != "NA" => value.to_string(),
        _ => format!("Unknown {name}"),
    }
}

/// Compiled notification templates.
pub struct MessageTemplates {
    templates: TemplateSet,
}

impl MessageTemplates {
    pub fn new() -> Result<Self, NotifyError> {
        let templates = TemplateSet::new(SUBJECT_TEMPLATE, HTML_TEMPLATE, TEXT_TEMPLATE)
            .map_err(|err| NotifyError::TemplateContext(err.to_string()))?;
        Ok(Self { templates })
    }

    pub fn render(&self, context: &MessageContext) -> Result<RenderedMessage, NotifyError> {
        self.templates
            .render(context)
            .map_err(|err| NotifyError::TemplateContext(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, TimeZone, Utc};
    use fishsoop_bucket::ObjectLocation;

    use super::*;
    use crate::record::Sample;

    fn record(attributes: &[(&str, &str)]) -> SensorRecord {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap();
        let samples = [(12.0, 10.0), (15.5, 20.0), (9.8, 30.0)]
            .iter()
            .enumerate()
            .map(|(idx, &(temperature, depth))| Sample {
                time: start + Duration::minutes(10 * idx as i64),
                latitude: -35.1,
                longitude: 150.8,
                temperature,
                depth,
                qc_flag: 1,
                phase: None,
            })
            .collect();
        SensorRecord {
            source: ObjectLocation::new("qc", "0028/MOANA_0028_15_240110093012_qc.nc"),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            samples,
        }
    }

    #[test]
    fn context_formats_statistics_and_times() {
        let record = record(&[
            ("programme_name", "Fish-Soop"),
            ("vessel_name", "Southern Endeavour"),
            ("vessel_id", "NA"),
            ("vessel_email", "a@x.com"),
            ("moana_serial_number", "28"),
        ]);
        let context = MessageContext::from_record(&record).unwrap();

        assert_eq!(context.time_min, "2024-01-10T06:00:00");
        assert_eq!(context.time_max, "2024-01-10T06:20:00");
        assert_eq!(context.temp_avg, "12.43");
        assert_eq!(context.depth_tmin, "30.0");
        assert_eq!(context.depth_tmax, "20.0");
        assert_eq!(context.vessel_id, "Unknown vessel_id");
        assert_eq!(context.contact_email, "FishSOOP@unsw.edu.au");
        assert_eq!(context.email_error, "None");
    }

    #[test]
    fn missing_vessel_email_is_a_context_error() {
        let record = record(&[("vessel_name", "Southern Endeavour")]);
        assert!(matches!(
            MessageContext::from_record(&record),
            Err(NotifyError::TemplateContext(_))
        ));
    }

    #[test]
    fn subject_names_vessel_and_window() {
        let record = record(&[("vessel_email", "a@x.com"), ("moana_serial_number", "28")]);
        let context = MessageContext::from_record(&record).unwrap();
        let rendered = MessageTemplates::new().unwrap().render(&context).unwrap();

        assert_eq!(
            rendered.subject,
            "Moana Serial Number 28 Temperature and Depth Data for Unknown vessel_name from 2024-01-10T06:00:00 to 2024-01-10T06:20:00"
        );
        assert!(rendered.html.contains("<style>"));
        assert!(rendered.text.contains("Errors: None"));
        assert!(rendered.text.contains("fishsoop@unsw.edu.au"));
    }
}
