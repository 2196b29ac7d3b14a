//! Capability set implemented by format-specific file types.
//!
//! A format variant (MPEG, FLAC, ...) embeds a [`TagFile`] and layers its own
//! tag and audio-property parsing on top of it, rather than extending a base
//! type. Generic callers work through [`AudioFile`].

use crate::core::{error::FileResult, file::TagFile};

pub trait AudioFile {
    /// Tag representation exposed by the format
    type Tag;

    /// Audio properties read from the stream
    type Properties;

    fn file(&self) -> &TagFile;

    fn file_mut(&mut self) -> &mut TagFile;

    /// Parsed tag, if the format found one
    fn tag(&self) -> Option<&Self::Tag>;

    /// Audio properties, if they were read
    fn audio_properties(&self) -> Option<&Self::Properties>;

    /// Write the tag back into the file.
    ///
    /// At most one process may write a given file at a time; nothing here
    /// guards against concurrent writers.
    fn save(&mut self) -> FileResult<()>;

    fn name(&self) -> Option<&str> {
        self.file().name()
    }

    fn is_valid(&self) -> bool {
        self.file().is_valid()
    }

    fn read_only(&self) -> bool {
        self.file().read_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::{MemoryIo, SharedBuffer};

    const HEAD: &[u8] = b"<TRL>";
    const TAIL: &[u8] = b"</TRL>";

    /// Trailer-tagged stream: `audio <TRL>title</TRL>`
    struct TrailerFile {
        file: TagFile,
        title: Option<String>,
        audio_len: u64,
        tag_span: Option<(u64, u64)>,
    }

    impl TrailerFile {
        fn read(file: TagFile) -> Self {
            let mut this = Self { file, title: None, audio_len: 0, tag_span: None };
            let length = this.file.length();

            let head = this.file.rfind(HEAD, None, None);
            let tail = head.and_then(|h| this.file.find(TAIL, h, None));
            match (head, tail) {
                (Some(h), Some(t)) => {
                    this.file.seek(h as i64 + HEAD.len() as i64, crate::core::Position::Beginning)
                        .unwrap();
                    let body = this.file.read_block((t - h) as usize - HEAD.len());
                    this.title = Some(String::from_utf8_lossy(&body).into_owned());
                    this.tag_span = Some((h, t + TAIL.len() as u64));
                    this.audio_len = h;
                }
                (Some(_), None) => this.file.set_valid(false),
                _ => this.audio_len = length,
            }
            this
        }

        fn set_title(&mut self, title: &str) {
            self.title = Some(title.to_owned());
        }
    }

    impl AudioFile for TrailerFile {
        type Tag = String;
        type Properties = u64;

        fn file(&self) -> &TagFile {
            &self.file
        }

        fn file_mut(&mut self) -> &mut TagFile {
            &mut self.file
        }

        fn tag(&self) -> Option<&String> {
            self.title.as_ref()
        }

        fn audio_properties(&self) -> Option<&u64> {
            Some(&self.audio_len)
        }

        fn save(&mut self) -> FileResult<()> {
            let mut block = HEAD.to_vec();
            block.extend_from_slice(self.title.as_deref().unwrap_or_default().as_bytes());
            block.extend_from_slice(TAIL);

            let (start, replace) = match self.tag_span {
                Some((s, e)) => (s, e - s),
                None => (self.audio_len, 0),
            };
            self.file.insert(&block, start, replace)?;
            self.tag_span = Some((start, start + block.len() as u64));
            Ok(())
        }
    }

    fn open(bytes: &[u8]) -> (TrailerFile, SharedBuffer) {
        let io = MemoryIo::new("trailer", bytes.to_vec());
        let buf = io.buffer();
        (TrailerFile::read(TagFile::with_io(Box::new(io))), buf)
    }

    #[test]
    fn reads_existing_trailer() {
        let (f, _) = open(b"AUDIODATA<TRL>Song</TRL>");
        assert!(f.is_valid());
        assert_eq!(f.tag().map(String::as_str), Some("Song"));
        assert_eq!(f.audio_properties(), Some(&9));
        assert_eq!(f.name(), Some("trailer"));
    }

    #[test]
    fn save_grows_and_shrinks_trailer() {
        let (mut f, buf) = open(b"AUDIODATA<TRL>Song</TRL>");
        f.set_title("A much longer title");
        f.save().unwrap();
        assert_eq!(
            buf.lock().unwrap().as_slice(),
            b"AUDIODATA<TRL>A much longer title</TRL>"
        );

        f.set_title("X");
        f.save().unwrap();
        assert_eq!(buf.lock().unwrap().as_slice(), b"AUDIODATA<TRL>X</TRL>");
    }

    #[test]
    fn save_appends_when_untagged() {
        let (mut f, buf) = open(b"AUDIO");
        assert!(f.tag().is_none());
        f.set_title("New");
        f.save().unwrap();
        assert_eq!(buf.lock().unwrap().as_slice(), b"AUDIO<TRL>New</TRL>");
    }

    #[test]
    fn broken_trailer_marks_file_invalid() {
        let (f, _) = open(b"AUDIO<TRL>dangling");
        assert!(!f.is_valid());
        assert!(!f.read_only());
    }
}
