//! Built-in one-page agreement used for demos and tests.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::features::pdf::PdfError;
use crate::features::projection::PageGeometry;

pub const SAMPLE_PAGE: PageGeometry = PageGeometry::new(595.28, 841.89);
const MARGIN: f64 = 50.0;
const BODY_LEADING: f64 = 14.0;
const BODY_FLOOR: f64 = 150.0;

const BODY: &[&str] = &[
    "This Employment Agreement is made as of the date written below between the Company",
    "and the undersigned Employee.",
    "",
    "1. ROLE",
    "The Employee will serve as Software Engineer and carry out the duties the Company assigns.",
    "",
    "2. PAY",
    "The Company will pay the agreed base salary on its regular payroll schedule.",
    "",
    "3. TERM",
    "This Agreement starts on the start date and runs until either party ends it under these terms.",
    "",
    "4. CONFIDENTIALITY",
    "The Employee will keep the Company's confidential information and trade secrets private,",
    "during and after employment.",
    "",
    "5. GOVERNING LAW",
    "This Agreement is governed by the laws where the Company has its seat.",
];

fn real(value: f64) -> Object {
    Object::Real(value as _)
}

fn text(font: &str, size: f64, x: f64, y: f64, gray: f64, line: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("rg", vec![real(gray), real(gray), real(gray)]),
        Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), real(size)]),
        Operation::new("Td", vec![real(x), real(y)]),
        Operation::new(
            "Tj",
            vec![Object::String(line.as_bytes().to_vec(), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

fn rule(x1: f64, x2: f64, y: f64, gray: f64) -> Vec<Operation> {
    vec![
        Operation::new("RG", vec![real(gray), real(gray), real(gray)]),
        Operation::new("w", vec![real(1.0)]),
        Operation::new("m", vec![real(x1), real(y)]),
        Operation::new("l", vec![real(x2), real(y)]),
        Operation::new("S", vec![]),
    ]
}

fn page_operations() -> Vec<Operation> {
    let width = SAMPLE_PAGE.width_pt;
    let height = SAMPLE_PAGE.height_pt;
    let mut ops = Vec::new();

    ops.extend(text("HB", 24.0, MARGIN, height - 60.0, 0.15, "Employment Agreement"));
    ops.extend(text(
        "H",
        12.0,
        MARGIN,
        height - 85.0,
        0.4,
        "Sample Document for Digital Signature",
    ));
    ops.extend(rule(MARGIN, width - MARGIN, height - 95.0, 0.7));

    let mut y = height - 130.0;
    for line in BODY {
        if y < BODY_FLOOR {
            break;
        }
        if !line.is_empty() {
            ops.extend(text("TR", 10.0, MARGIN, y, 0.0, line));
        }
        y -= BODY_LEADING;
    }

    y -= 30.0;
    ops.extend(text("HB", 11.0, MARGIN, y, 0.0, "EMPLOYEE SIGNATURE:"));
    ops.extend(rule(MARGIN, 300.0, y - 35.0, 0.5));
    ops.extend(text("H", 9.0, MARGIN, y - 50.0, 0.5, "Signature"));
    ops.extend(text("TR", 10.0, 320.0, y - 35.0, 0.0, "Date: _______________"));
    ops.extend(text("H", 9.0, width / 2.0 - 30.0, 30.0, 0.5, "Page 1 of 1"));
    ops
}

/// One A4 page: title, numbered clauses, signature and date lines.
pub fn agreement_pdf() -> Result<Vec<u8>, PdfError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font = |base: &str| {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base.as_bytes().to_vec()),
            "Encoding" => "WinAnsiEncoding",
        }
    };
    let helvetica = doc.add_object(font("Helvetica"));
    let helvetica_bold = doc.add_object(font("Helvetica-Bold"));
    let times = doc.add_object(font("Times-Roman"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "H" => helvetica,
            "HB" => helvetica_bold,
            "TR" => times,
        },
    });

    let content = Content {
        operations: page_operations(),
    };
    let encoded = content
        .encode()
        .map_err(|e| PdfError::Operation(format!("sample_content_failed:{e}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            real(SAMPLE_PAGE.width_pt),
            real(SAMPLE_PAGE.height_pt),
        ],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| PdfError::Operation(format!("sample_save_failed:{e}")))?;
    Ok(out)
}
