use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::Object;
use std::{collections::BTreeMap, io::BufWriter, mem};
use time::OffsetDateTime;

use crate::error::{ContextError, ErrorKind};

/// The low-level image representation for a PDF document. The samples are stored as
/// 8-bit RGB triples without any transparency.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image in samples.
    pub width: u32,
    /// Height of the image in samples.
    pub height: u32,
    /// Should the image be interpolated when scaled?
    pub interpolate: bool,
    /// The RGB samples, row by row from the top.
    pub image_data: Vec<u8>,
}

impl ImageXObject {
    /// Drops the alpha channel of the image. Rendered pages are fully opaque, so nothing is lost.
    pub fn from_rgba_image(image: &RgbaImage) -> Self {
        let image_data = image
            .pixels()
            .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
            .collect();

        ImageXObject {
            width: image.width(),
            height: image.height(),
            interpolate: false,
            image_data,
        }
    }
}

/// `XObject`s are parts of the PDF specification. They allow for complex behavior to be
/// inserted into the PDF document: this comprises bookmarks, annotations and even images.
/// Only images are supported here.
#[derive(Debug, Clone)]
pub enum XObject {
    /// The `XObject` interface for an image. It can be converted into a `lopdf::Object`.
    Image(ImageXObject),
}

impl From<XObject> for lopdf::Object {
    fn from(value: XObject) -> Self {
        match value {
            XObject::Image(image) => {
                let dictionary = lopdf::Dictionary::from_iter(vec![
                    ("Type", Object::Name("XObject".into())),
                    ("Subtype", Object::Name("Image".into())),
                    ("Width", Object::Integer(image.width as i64)),
                    ("Height", Object::Integer(image.height as i64)),
                    ("ColorSpace", Object::Name("DeviceRGB".into())),
                    ("BitsPerComponent", Object::Integer(8)),
                    ("Interpolate", Object::Boolean(image.interpolate)),
                ]);
                // The samples get compressed along with the other streams when the document is optimized
                Object::Stream(lopdf::Stream::new(dictionary, image.image_data))
            }
        }
    }
}

/// Named reference to an `XObject`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct XObjectReference(String);

impl XObjectReference {
    /// Creates a new reference for an `XObject` from a number.
    pub fn new(index: usize) -> Self {
        Self(format!("X{index}"))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// The association between the `XObject`s names and the actual `XObject`s themselves. The map is
/// ordered so that the objects are always inserted into the document in the same order.
#[derive(Default, Debug, Clone)]
pub struct XObjectMap(BTreeMap<String, XObject>);

impl XObjectMap {
    /// Adds an `XObject` under the next free name and returns the reference to it.
    pub fn add_xobject(&mut self, xobject: XObject) -> XObjectReference {
        let xobject_reference = XObjectReference::new(self.0.len());
        self.0.insert(xobject_reference.0.clone(), xobject);

        xobject_reference
    }

    /// Inserts the `XObject`s into the document, simultaneously constructing a PDF dictionary of them.
    pub fn into_with_document(&self, document: &mut lopdf::Document) -> lopdf::Dictionary {
        self.0
            .iter()
            .map(|(name, object)| {
                let object: lopdf::Object = object.clone().into();
                let object_reference = document.add_object(object);
                (name.clone(), lopdf::Object::Reference(object_reference))
            })
            .collect()
    }
}

/// The representation of a PDF page, whose size is given in points.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub width: u32,
    pub height: u32,
    /// The content stream operations of the page.
    pub(crate) operations: Vec<Operation>,
    pub(crate) xobjects: XObjectMap,
}

impl PdfPage {
    /// Inserts the resources of the page into the document, then encodes its content stream.
    fn collect_resources_and_stream(
        &self,
        inner_document: &mut lopdf::Document,
    ) -> Result<(lopdf::Dictionary, lopdf::Stream), ContextError> {
        let mut resource_dictionary = lopdf::Dictionary::new();
        let xobjects_dictionary = self.xobjects.into_with_document(inner_document);
        if !xobjects_dictionary.is_empty() {
            resource_dictionary.set("XObject", Object::Dictionary(xobjects_dictionary));
        }

        let stream_content = Content {
            operations: self.operations.clone(),
        }
        .encode()
        .map_err(|error| {
            ContextError::with_error(
                ErrorKind::Export,
                "Failed to encode the content of a PDF page",
                &error,
            )
        })?;

        Ok((
            resource_dictionary,
            lopdf::Stream::new(lopdf::Dictionary::new(), stream_content),
        ))
    }
}

/// This struct represents the actual PDF document on a high-level. It is an interface to the actual
/// underlying `lopdf::Document` with the addition of the PDF pages and the document ID.
pub struct PdfDocument {
    /// The underlying PDF document: this is a low-level interface and shouldn't be directly interacted with
    /// unless strictly necessary.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used to in order to set the PDF `ID` tag.
    pub identifier: String,
    pub(crate) pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Create a new `PdfDocument` by defaulting the underlying PDF document to version 1.5
    /// of the PDF specification and customly specifying the PDF identifier.
    pub fn new(pdf_document_identifier: String) -> Self {
        PdfDocument {
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier,
            pages: Vec::new(),
        }
    }

    /// Adds an empty page of the given size in points and returns its index.
    pub fn add_page(&mut self, page_width: u32, page_height: u32) -> usize {
        self.pages.push(PdfPage {
            width: page_width,
            height: page_height,
            operations: Vec::new(),
            xobjects: XObjectMap::default(),
        });

        self.pages.len() - 1
    }

    /// Adds a page exactly the size of the image, one pixel per point, with the image covering it.
    pub fn add_image_page(&mut self, image: &RgbaImage) -> Result<usize, ContextError> {
        let page_index = self.add_page(image.width(), image.height());
        self.draw_image_in_page(page_index, image, [0.0, 0.0], [image.width(), image.height()])?;

        Ok(page_index)
    }

    /// Draws the image stretched to the given size, with its lower left corner at `origin`.
    pub fn draw_image_in_page(
        &mut self,
        page_index: usize,
        image: &RgbaImage,
        origin: [f32; 2],
        size: [u32; 2],
    ) -> Result<XObjectReference, ContextError> {
        let page = self.pages.get_mut(page_index).ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::Export,
                format!("Unable to find the page {} in the PDF document", page_index),
            )
        })?;
        let xobject_reference = page
            .xobjects
            .add_xobject(XObject::Image(ImageXObject::from_rgba_image(image)));

        // An image XObject occupies the unit square, the matrix scales and moves it into place
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(size[0] as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(size[1] as i64),
                    origin[0].into(),
                    origin[1].into(),
                ],
            ),
            Operation::new(
                "Do",
                vec![Object::Name(xobject_reference.name().as_bytes().to_vec())],
            ),
            Operation::new("Q", vec![]),
        ]);

        Ok(xobject_reference)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Writes the catalog, the document info and the pages into the underlying PDF document.
    /// The dates are pinned to the UNIX epoch, so the same pages always produce the same bytes.
    pub fn write_all(&mut self, instance_id: String, title: &str) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        let epoch_timestamp = to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", "False".into()),
            (
                "CreationDate",
                String(epoch_timestamp.clone().into_bytes(), Literal),
            ),
            ("ModDate", String(epoch_timestamp.into_bytes(), Literal)),
            ("Title", String(title.as_bytes().to_vec(), Literal)),
            (
                "Creator",
                String(env!("CARGO_PKG_NAME").as_bytes().to_vec(), Literal),
            ),
            (
                "Producer",
                String(env!("CARGO_PKG_NAME").as_bytes().to_vec(), Literal),
            ),
            (
                "Identifier",
                String(self.identifier.clone().into_bytes(), Literal),
            ),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // Construct the catalog, required by the PDF specification
        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.into_bytes(), Literal),
            ]),
        );

        let mut page_ids = Vec::<lopdf::Object>::new();
        for page in self.pages.iter() {
            let page_box: lopdf::Object = vec![
                0.into(),
                0.into(),
                Integer(page.width as i64),
                Integer(page.height as i64),
            ]
            .into();
            let mut page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Rotate", Integer(0)),
                ("MediaBox", page_box.clone()),
                ("TrimBox", page_box.clone()),
                ("CropBox", page_box),
                ("Parent", Reference(pages_id)),
            ]);

            let (resource_dictionary, content_stream) =
                page.collect_resources_and_stream(&mut self.inner_document)?;
            let resources_page_id = self
                .inner_document
                .add_object(Dictionary(resource_dictionary));
            page_dictionary.set("Resources", Reference(resources_page_id));
            let page_content_id = self.inner_document.add_object(content_stream);
            page_dictionary.set("Contents", Reference(page_content_id));

            let page_id = self.inner_document.add_object(page_dictionary);
            page_ids.push(Reference(page_id))
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(self.pages.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Optimize the PDF document (only superficially), this also compresses the image samples.
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Export,
                "Error while saving the PDF document to bytes",
                &error,
            )
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn the_epoch_is_formatted_as_a_pdf_date() {
        assert_eq!(
            to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH),
            "D:19700101000000+00'00'"
        );
    }

    #[test]
    fn rgba_samples_lose_their_alpha() {
        let image = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 255]));
        let xobject = ImageXObject::from_rgba_image(&image);

        assert_eq!(xobject.image_data, vec![10, 20, 30, 10, 20, 30]);
    }

    #[test]
    fn pages_take_the_size_of_their_image() {
        let mut pdf_document = PdfDocument::new("test".into());
        let image = RgbaImage::from_pixel(30, 40, Rgba([255, 255, 255, 255]));
        pdf_document.add_image_page(&image).unwrap();
        pdf_document.write_all("0".repeat(32), "Test").unwrap();
        pdf_document.optimize();
        let bytes = pdf_document.save_to_bytes().unwrap();

        let loaded_document = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = loaded_document.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = pages.values().next().copied().unwrap();
        let media_box = loaded_document
            .get_object(page_id)
            .and_then(Object::as_dict)
            .and_then(|page| page.get(b"MediaBox"))
            .and_then(Object::as_array)
            .unwrap()
            .iter()
            .map(|value| value.as_i64().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(media_box, vec![0, 0, 30, 40]);
    }

    #[test]
    fn drawing_into_a_missing_page_fails() {
        let mut pdf_document = PdfDocument::new("test".into());
        let image = RgbaImage::new(1, 1);

        let error = pdf_document
            .draw_image_in_page(3, &image, [0.0, 0.0], [1, 1])
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Export);
    }
}
