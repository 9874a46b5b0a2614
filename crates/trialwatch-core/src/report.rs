//! Classification of new records and rendering of the notification payload.

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::models::{Record, Snapshot};

/// Title marker of digital medical device trials.
pub const DEFAULT_FLAG_MARKER: &str = "[디지털의료기기]";

const SUBJECT_PREFIX: &str = "[MFDS 임상시험]";

/// A rendered notification, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Notification {
    pub subject: String,
    pub html_body: String,
}

/// New records split by the flag marker.
#[derive(Debug, Default)]
pub struct Classified<'a> {
    pub flagged: Vec<&'a Record>,
    pub others: Vec<&'a Record>,
}

/// Partition records by whether the title contains `marker`.
///
/// Plain substring match. An empty marker flags nothing, and so does an
/// empty title.
pub fn classify<'a>(items: &'a Snapshot, marker: &str) -> Classified<'a> {
    let mut classified = Classified::default();
    for record in items {
        if !marker.is_empty() && record.title.contains(marker) {
            classified.flagged.push(record);
        } else {
            classified.others.push(record);
        }
    }
    classified
}

/// Render the notification for a set of new records.
///
/// Returns `None` when there are no new records; nothing is sent then.
pub fn render(new_items: &Snapshot, marker: &str, run_date: NaiveDate) -> Option<Notification> {
    if new_items.is_empty() {
        return None;
    }

    let total = new_items.len();
    let classified = classify(new_items, marker);
    let category = category_label(marker);

    let subject = format!(
        "{SUBJECT_PREFIX} 신규 승인 {total}건 - {}",
        run_date.format("%Y-%m-%d")
    );

    let mut body = String::new();
    body.push_str("<html>\n<body>\n");
    body.push_str("<h2>MFDS 임상시험 신규 승인 알림</h2>\n");
    let _ = writeln!(
        body,
        "<p>새로 승인된 임상시험이 <strong>{total}건</strong> 있습니다.</p>"
    );

    let _ = writeln!(body, "<h3>{} 임상시험</h3>", escape_html(&category));
    if classified.flagged.is_empty() {
        let _ = writeln!(body, "<p>{} 임상시험은 없습니다.</p>", escape_html(&category));
    } else {
        let _ = writeln!(
            body,
            "<p>{}: <strong>{}건</strong> / 그 외 {}건</p>",
            escape_html(&category),
            classified.flagged.len(),
            classified.others.len()
        );
        push_table(&mut body, classified.flagged.iter().copied());
    }

    body.push_str("<h3>전체 신규 승인 목록</h3>\n");
    push_table(&mut body, new_items.iter());
    body.push_str("</body>\n</html>\n");

    Some(Notification {
        subject,
        html_body: body,
    })
}

/// Human label of the flagged category: the marker without its brackets.
fn category_label(marker: &str) -> String {
    let label = marker.trim().trim_start_matches('[').trim_end_matches(']').trim();
    if label.is_empty() {
        "주요 분류".to_string()
    } else {
        label.to_string()
    }
}

fn push_table<'a>(body: &mut String, records: impl Iterator<Item = &'a Record>) {
    body.push_str("<table border='1' cellpadding='5'>\n");
    body.push_str("<tr><th>연번</th><th>승인일자</th><th>품목명</th><th>임상시험 제목</th></tr>\n");
    for record in records {
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&record.sequence_id),
            escape_html(&record.approval_date),
            escape_html(&record.item_name),
            escape_html(&record.title),
        );
    }
    body.push_str("</table>\n");
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
