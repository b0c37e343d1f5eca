//! Personio public XML job feed.

use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::domain::models::{BoardPage, RawJob};
use crate::error::FetchError;

#[derive(Default)]
struct Position {
    name: Option<String>,
    office: Option<String>,
    department: Option<String>,
}

/// Parse the `<workzag-jobs>` feed. A feed with zero positions is a valid
/// empty board; a body without the feed root is a parse failure.
pub fn parse(body: &str) -> Result<BoardPage, FetchError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut jobs: Vec<RawJob> = Vec::new();
    let mut saw_root = false;
    let mut current: Option<Position> = None;
    let mut field: Option<&'static str> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"workzag-jobs" => saw_root = true,
                b"position" => current = Some(Position::default()),
                b"name" => field = Some("name"),
                b"office" => field = Some("office"),
                b"department" => field = Some("department"),
                _ => field = None,
            },
            Ok(Event::Text(t)) => {
                if let (Some(pos), Some(f)) = (current.as_mut(), field) {
                    let decoded = t
                        .decode()
                        .map_err(|e| FetchError::parse(format!("personio feed: {}", e)))?;
                    let text = unescape(&decoded)
                        .map_err(|e| FetchError::parse(format!("personio feed: {}", e)))?
                        .into_owned();
                    set_field(pos, f, text);
                }
            }
            Ok(Event::CData(t)) => {
                if let (Some(pos), Some(f)) = (current.as_mut(), field) {
                    let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                    set_field(pos, f, text);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"position" => {
                    if let Some(pos) = current.take() {
                        if let Some(name) = pos.name {
                            jobs.push(RawJob {
                                title: name,
                                location: pos.office,
                                department: pos.department,
                                url: None,
                                description: None,
                                remote: None,
                            });
                        }
                    }
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::parse(format!("personio feed: {}", e))),
            _ => {}
        }
    }

    if !saw_root {
        return Err(FetchError::parse("personio feed: missing workzag-jobs root"));
    }

    Ok(BoardPage {
        board_name: None,
        jobs,
        total: None,
    })
}

fn set_field(pos: &mut Position, field: &str, text: String) {
    let slot = match field {
        "name" => &mut pos.name,
        "office" => &mut pos.office,
        _ => &mut pos.department,
    };
    if slot.is_none() && !text.trim().is_empty() {
        *slot = Some(text.trim().to_string());
    }
}
