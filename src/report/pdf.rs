use chrono::NaiveDate;
use lopdf::{
    Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};

use crate::model::salary::SalaryRecord;

pub const PORTAL_TITLE: &str = "College Portal";

// A4 portrait, in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const VALUE_COLUMN: i64 = 220;

/// A run of payslips, optionally introduced by a heading page.
#[derive(Debug)]
pub struct Section<'a> {
    pub heading: Option<String>,
    pub records: &'a [SalaryRecord],
}

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static [u8] {
        match self {
            Font::Regular => b"F1",
            Font::Bold => b"F2",
        }
    }
}

/// Built-in Type1 fonts only encode a Latin subset; anything else is
/// replaced so the content stream stays valid.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .collect()
}

fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

#[derive(Default)]
struct Page {
    ops: Vec<Operation>,
}

impl Page {
    fn text(&mut self, font: Font, size: i64, x: i64, y: i64, text: &str) {
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font.resource_name().to_vec()), Object::Integer(size)],
            ),
            Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
            Operation::new("Tj", vec![Object::string_literal(printable(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn rule(&mut self, y: i64) {
        self.ops.extend([
            Operation::new("m", vec![Object::Integer(MARGIN), Object::Integer(y)]),
            Operation::new("l", vec![Object::Integer(PAGE_WIDTH - MARGIN), Object::Integer(y)]),
            Operation::new("S", vec![]),
        ]);
    }

    fn header(&mut self, subtitle: &str) -> i64 {
        let top = PAGE_HEIGHT - MARGIN;
        self.text(Font::Bold, 20, MARGIN, top, PORTAL_TITLE);
        self.text(Font::Bold, 14, MARGIN, top - 26, subtitle);
        self.rule(top - 38);
        top - 66
    }

    fn footer(&mut self, generated: NaiveDate) {
        self.text(
            Font::Regular,
            9,
            MARGIN,
            MARGIN - 20,
            &format!("Generated on {generated}"),
        );
    }
}

fn payslip(record: &SalaryRecord, generated: NaiveDate) -> Page {
    let mut page = Page::default();
    let mut y = page.header(&format!("Payslip for {}", record.period()));

    let department = record.department.as_deref().unwrap_or("-");
    let designation = record.designation.as_deref().unwrap_or("-");
    for (label, value) in [
        ("Name", record.faculty_name.as_str()),
        ("Username", record.faculty_username.as_str()),
        ("Department", department),
        ("Designation", designation),
    ] {
        page.text(Font::Bold, 11, MARGIN, y, label);
        page.text(Font::Regular, 11, VALUE_COLUMN, y, value);
        y -= 20;
    }

    y -= 8;
    page.rule(y);
    y -= 28;

    for (label, amount) in [
        ("Basic Pay", record.basic_pay),
        ("Allowances", record.allowances),
        ("Deductions", record.deductions),
    ] {
        page.text(Font::Regular, 11, MARGIN, y, label);
        page.text(Font::Regular, 11, VALUE_COLUMN, y, &money(amount));
        y -= 20;
    }
    page.rule(y + 8);
    y -= 12;
    page.text(Font::Bold, 12, MARGIN, y, "Net Pay");
    page.text(Font::Bold, 12, VALUE_COLUMN, y, &money(record.net_pay));

    page.footer(generated);
    page
}

fn heading_page(heading: &str, count: usize, generated: NaiveDate) -> Page {
    let mut page = Page::default();
    let y = page.header(&format!("Salary Report: {heading}"));
    page.text(
        Font::Regular,
        12,
        MARGIN,
        y,
        &format!("{count} payslip(s) follow."),
    );
    page.footer(generated);
    page
}

fn empty_page(scope: &str, generated: NaiveDate) -> Page {
    let mut page = Page::default();
    let y = page.header("Salary Report");
    page.text(
        Font::Regular,
        12,
        MARGIN,
        y,
        &format!("No salary records found for {scope}."),
    );
    page.footer(generated);
    page
}

/// Renders the sections as one PDF, one payslip per page. With no records
/// at all, the document is a single page saying so.
pub fn render(
    scope: &str,
    sections: &[Section<'_>],
    generated: NaiveDate,
) -> Result<Vec<u8>, lopdf::Error> {
    let mut pages = Vec::new();
    for section in sections {
        if let Some(heading) = &section.heading {
            pages.push(heading_page(heading, section.records.len(), generated));
        }
        pages.extend(section.records.iter().map(|r| payslip(r, generated)));
    }
    if sections.iter().all(|s| s.records.is_empty()) {
        pages = vec![empty_page(scope, generated)];
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page.ops,
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(lopdf::Error::from)?;
    Ok(bytes)
}
