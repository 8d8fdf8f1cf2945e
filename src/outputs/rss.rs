//! RSS 2.0 rendering of the filtered feed.
//!
//! Item fields arrive already escaped (see [`RssItem`]), so they are written
//! as pre-escaped text; channel metadata comes from configuration as plain
//! text and is escaped here with the same [`xml_escape`].

use crate::config::ChannelConfig;
use crate::error::WriteError;
use crate::filter::xml_escape;
use crate::models::{FilteredFeed, RssItem};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io;

/// Render the complete `index.xml` document.
///
/// The result is always a well-formed RSS 2.0 document, including when the
/// feed has no items.
pub fn render_rss(feed: &FilteredFeed, channel: &ChannelConfig) -> Result<String, WriteError> {
    build_document(feed, channel).map_err(WriteError::Render)
}

fn build_document(feed: &FilteredFeed, channel: &ChannelConfig) -> io::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut writer, "title", &xml_escape(&channel.title))?;
    write_text_element(&mut writer, "link", &xml_escape(&channel.link))?;
    write_text_element(&mut writer, "description", &xml_escape(&channel.description))?;
    write_text_element(&mut writer, "lastBuildDate", &feed.built_at.to_rfc2822())?;

    for item in &feed.items {
        write_item(&mut writer, item)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut xml = String::from_utf8(writer.into_inner())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    xml.push('\n');
    Ok(xml)
}

fn write_item<W: io::Write>(writer: &mut Writer<W>, item: &RssItem) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;
    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "link", &item.link)?;
    write_text_element(writer, "pubDate", &item.pub_date)?;
    write_text_element(writer, "description", &item.description)?;
    writer.write_event(Event::End(BytesEnd::new("item")))
}

/// `<name>escaped</name>`; `escaped` must already be valid XML text.
fn write_text_element<W: io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    escaped: &str,
) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escaped)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}
