/* 📖 # How is an FB2 payload turned into a document?

FB2 is a single XML file:

```xml
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">
  <description><title-info><book-title>…</book-title></title-info></description>
  <body><section><p>…</p><section>…</section></section></body>
  <body name="notes">…</body>
  <binary>…</binary>
</FictionBook>
```

Only two things are read: the first `FictionBook/description/title-info/book-title`, and
the `section` tree of the first `FictionBook/body`. Inside a section only direct `p`
children (their full text, inline markup dropped) and direct `section` children are kept;
titles, epigraphs, poems, images and everything else are skipped. Elements are matched by
local name, so namespace prefixes do not matter.

Missing pieces are not errors (a book without a title or body parses to an empty
document). Malformed XML is: mismatched or unclosed tags and broken entities fail with
`ErrorKind::ParseFailure`.
*/

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, instrument};

use lectern_base::{LecternError, LecternResult};

use crate::document::{BookDocument, Section};

/// Parse an FB2 payload.
#[instrument(skip(xml), fields(bytes = xml.len()))]
pub fn parse_book(xml: &str) -> LecternResult<BookDocument> {
    let mut reader = Reader::from_str(xml);
    let mut document = BookDocument::default();
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut body_seen = false;

    loop {
        match next_event(&mut reader)? {
            Event::Start(start) => {
                let name = start.local_name().as_ref().to_vec();
                if is_path(&open, &["FictionBook"]) && name == b"body" && !body_seen {
                    body_seen = true;
                    document.sections = parse_body(&mut reader)?;
                } else if is_path(&open, &["FictionBook", "description", "title-info"])
                    && name == b"book-title"
                    && document.title.is_none()
                {
                    let title = read_text(&mut reader)?;
                    let title = title.trim();
                    if !title.is_empty() {
                        document.title = Some(title.to_string());
                    }
                } else {
                    open.push(name);
                }
            }
            Event::End(_) => {
                if open.pop().is_none() {
                    return Err(parse_error(&reader, "unexpected closing tag"));
                }
            }
            Event::Eof => {
                if let Some(name) = open.last() {
                    return Err(parse_error(
                        &reader,
                        &format!(
                            "unexpected end of document inside <{}>",
                            String::from_utf8_lossy(name)
                        ),
                    ));
                }
                break;
            }
            _ => {}
        }
    }

    debug!(
        title = ?document.title,
        sections = document.sections.len(),
        "parsed book"
    );
    Ok(document)
}

fn is_path(open: &[Vec<u8>], expected: &[&str]) -> bool {
    open.len() == expected.len()
        && open
            .iter()
            .zip(expected)
            .all(|(name, expected)| name.as_slice() == expected.as_bytes())
}

fn parse_body(reader: &mut Reader<&[u8]>) -> LecternResult<Vec<Section>> {
    let mut sections = Vec::new();
    loop {
        match next_event(reader)? {
            Event::Start(start) if start.local_name().as_ref() == b"section" => {
                sections.push(parse_section(reader)?);
            }
            Event::Start(start) => skip_element(reader, &start)?,
            Event::End(_) => return Ok(sections),
            Event::Eof => return Err(parse_error(reader, "unexpected end of document inside <body>")),
            _ => {}
        }
    }
}

fn parse_section(reader: &mut Reader<&[u8]>) -> LecternResult<Section> {
    let mut section = Section::new();
    loop {
        match next_event(reader)? {
            Event::Start(start) => match start.local_name().as_ref() {
                b"p" => section.paragraphs.push(read_text(reader)?),
                b"section" => section.sections.push(parse_section(reader)?),
                _ => skip_element(reader, &start)?,
            },
            Event::Empty(empty) => match empty.local_name().as_ref() {
                b"p" => section.paragraphs.push(String::new()),
                b"section" => section.sections.push(Section::new()),
                _ => {}
            },
            Event::End(_) => return Ok(section),
            Event::Eof => {
                return Err(parse_error(reader, "unexpected end of document inside <section>"));
            }
            _ => {}
        }
    }
}

/// Concatenated text of everything up to the end of the current element, markup dropped.
fn read_text(reader: &mut Reader<&[u8]>) -> LecternResult<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match next_event(reader)? {
            Event::Text(content) => {
                let unescaped = content
                    .unescape()
                    .map_err(|e| parse_error(reader, &e.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::CData(content) => text.push_str(&String::from_utf8_lossy(&content)),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(text),
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(parse_error(reader, "unexpected end of document inside text")),
            _ => {}
        }
    }
}

fn skip_element(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> LecternResult<()> {
    reader
        .read_to_end(start.name())
        .map_err(|e| parse_error(reader, &e.to_string()))?;
    Ok(())
}

fn next_event<'a>(reader: &mut Reader<&'a [u8]>) -> LecternResult<Event<'a>> {
    reader
        .read_event()
        .map_err(|e| parse_error(reader, &e.to_string()))
}

fn parse_error(reader: &Reader<&[u8]>, message: &str) -> Box<LecternError> {
    Box::new(LecternError::parse_failure(format!(
        "{} (at byte {})",
        message,
        reader.buffer_position()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_base::ErrorKind;

    const BOOK: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink">
  <description>
    <title-info>
      <genre>prose_classic</genre>
      <author><first-name>Михаил</first-name><last-name>Булгаков</last-name></author>
      <book-title>Мастер и Маргарита</book-title>
    </title-info>
    <document-info><book-title>Not this one</book-title></document-info>
  </description>
  <body>
    <title><p>Часть первая</p></title>
    <section>
      <title><p>Глава 1</p></title>
      <epigraph><p>...так кто ж ты, наконец?</p></epigraph>
      <p>Однажды весною.</p>
      <p>В час <emphasis>небывало</emphasis> жаркого заката.</p>
      <empty-line/>
      <section>
        <p>Nested &amp; escaped.</p>
      </section>
    </section>
    <section><p>Second.</p></section>
  </body>
  <body name="notes"><section><p>A footnote.</p></section></body>
  <binary id="cover.jpg" content-type="image/jpeg">AAAA</binary>
</FictionBook>"#;

    #[test]
    fn test_parse_title_and_sections() {
        let document = parse_book(BOOK).unwrap();

        assert_eq!(document.title.as_deref(), Some("Мастер и Маргарита"));
        assert_eq!(
            document.sections,
            vec![
                Section::with_paragraphs(["Однажды весною.", "В час небывало жаркого заката."])
                    .with_child(Section::with_paragraphs(["Nested & escaped."])),
                Section::with_paragraphs(["Second."]),
            ]
        );
    }

    #[test]
    fn test_prefixed_element_names() {
        let xml = r#"<fb:FictionBook xmlns:fb="http://www.gribuser.ru/xml/fictionbook/2.0">
            <fb:body><fb:section><fb:p>Prefixed</fb:p></fb:section></fb:body>
        </fb:FictionBook>"#;

        let document = parse_book(xml).unwrap();
        assert_eq!(document.sections, vec![Section::with_paragraphs(["Prefixed"])]);
    }

    #[test]
    fn test_missing_parts_default_to_empty() {
        let document = parse_book("<FictionBook><description/></FictionBook>").unwrap();
        assert_eq!(document, BookDocument::default());

        let document = parse_book("").unwrap();
        assert_eq!(document, BookDocument::default());
    }

    #[test]
    fn test_blank_title_is_absent() {
        let xml = "<FictionBook><description><title-info><book-title>  </book-title></title-info></description></FictionBook>";
        assert_eq!(parse_book(xml).unwrap().title, None);
    }

    #[test]
    fn test_other_root_element_yields_empty_document() {
        let xml = "<html><body><section><p>x</p></section></body></html>";
        assert_eq!(parse_book(xml).unwrap(), BookDocument::default());
    }

    #[test]
    fn test_empty_paragraph_and_section_elements() {
        let xml = "<FictionBook><body><section><p/><p>x</p><section/></section></body></FictionBook>";
        let document = parse_book(xml).unwrap();
        assert_eq!(
            document.sections,
            vec![Section::with_paragraphs(["", "x"]).with_child(Section::new())]
        );
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let err = parse_book("<FictionBook><body><section><p>x</section></body></FictionBook>")
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ParseFailure { .. }), "{}", err);
    }

    #[test]
    fn test_truncated_document_fails() {
        let err = parse_book("<FictionBook><body><section><p>Once upon").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ParseFailure { .. }), "{}", err);

        let err = parse_book("<FictionBook><description>").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ParseFailure { .. }), "{}", err);
    }

    #[test]
    fn test_unknown_entity_fails() {
        let err = parse_book("<FictionBook><body><section><p>a&nbsp;b</p></section></body></FictionBook>")
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ParseFailure { .. }), "{}", err);
    }
}
