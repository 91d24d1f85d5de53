use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use pdfsplice::{
    DecoderChain, Dictionary, Numeric, ObjRef, Object, ObjectStream, PdfReader, Stream,
    TopLevelObject, Version,
};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "pdfsplice",
    about = "Break a PDF into its constructs and put it back together",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a PDF into one file per top-level construct
    Break {
        /// Input PDF file
        input: PathBuf,

        /// Directory the construct files are written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Keep stream payloads encoded instead of writing decoded
        /// side files
        #[arg(long)]
        no_decode: bool,
    },

    /// Concatenate construct files into a PDF with a fresh
    /// cross-reference table
    Assemble {
        /// Input files: PDFs or construct files from `break`
        inputs: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long, default_value = "out.pdf")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Break {
            input,
            output_dir,
            no_decode,
        } => cmd_break(&input, &output_dir, !no_decode),
        Commands::Assemble { inputs, output } => cmd_assemble(&inputs, &output),
    }
}

fn cmd_break(input: &Path, output_dir: &Path, decode: bool) -> Result<()> {
    let mut reader = PdfReader::open(input)
        .with_context(|| format!("can't open {} for reading", input.display()))?;
    match reader.read_version()? {
        Some(version) if version.major == 1 => {}
        Some(version) => warn!("unexpected PDF version {version}"),
        None => warn!("{} has no %PDF header", input.display()),
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("can't create {}", output_dir.display()))?;

    let mut counters = [0u32; 3]; // xref, trailer, startxref
    loop {
        let tlo = reader.read_top_level_object()?;
        match &tlo {
            TopLevelObject::Null => break,
            TopLevelObject::NamedObject(obj) => {
                if obj.failed() {
                    warn!("object {} {} parsed with errors", obj.num, obj.gen);
                }
                let path = output_dir.join(format!("obj_{}_{}.obj", obj.num, obj.gen));
                write_construct(&path, &tlo)?;
                if let Object::Stream(stream) = &obj.contents {
                    if decode {
                        write_stream_payload(output_dir, obj.num, obj.gen, stream)?;
                    }
                    if stream.dict.type_name() == Some(b"ObjStm".as_slice()) {
                        expand_object_stream(output_dir, obj.num, stream)?;
                    }
                }
            }
            TopLevelObject::XRefTable(_) => {
                let path = output_dir.join(format!("xref_{}.obj", counters[0]));
                counters[0] += 1;
                write_construct(&path, &tlo)?;
            }
            TopLevelObject::Trailer(_) => {
                let path = output_dir.join(format!("trailer_{}.obj", counters[1]));
                counters[1] += 1;
                write_construct(&path, &tlo)?;
            }
            TopLevelObject::StartXRef(_) => {
                let path = output_dir.join(format!("startxref_{}.obj", counters[2]));
                counters[2] += 1;
                write_construct(&path, &tlo)?;
            }
            TopLevelObject::Invalid(error) => {
                eprintln!("{}: {error}", input.display());
            }
        }
    }
    Ok(())
}

fn write_construct(path: &Path, tlo: &TopLevelObject) -> Result<()> {
    let mut out = BufWriter::new(
        File::create(path).with_context(|| format!("can't create {}", path.display()))?,
    );
    tlo.dump(&mut out, 0)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Write the decoded payload next to the construct file, falling back
/// to the raw bytes when the chain reports a decode error.
fn write_stream_payload(output_dir: &Path, num: u64, gen: u64, stream: &Stream) -> Result<()> {
    let (extension, bytes) = match DecoderChain::new(stream) {
        Ok(mut chain) => {
            let extension = chain.suggested_extension();
            match chain.decode_all() {
                Ok(decoded) => (extension, decoded),
                Err(error) => {
                    warn!("object {num} {gen}: {error}, keeping raw payload");
                    ("data", stream.data.clone())
                }
            }
        }
        Err(error) => {
            warn!("object {num} {gen}: {error}, keeping raw payload");
            ("data", stream.data.clone())
        }
    };
    let path = output_dir.join(format!("obj_{num}_{gen}.{extension}"));
    fs::write(&path, bytes).with_context(|| format!("can't write {}", path.display()))?;
    Ok(())
}

/// Pull the named objects out of a `/Type /ObjStm` stream and write
/// each as its own construct file.
fn expand_object_stream(output_dir: &Path, carrier: u64, stream: &Stream) -> Result<()> {
    let mut objects = match ObjectStream::new(stream) {
        Ok(objects) => objects,
        Err(error) => {
            warn!("object stream {carrier}: {error}");
            return Ok(());
        }
    };
    loop {
        match objects.read()? {
            TopLevelObject::Null => break,
            TopLevelObject::Invalid(error) => {
                warn!("object stream {carrier}: {error}");
                break;
            }
            tlo @ TopLevelObject::NamedObject(_) => {
                let TopLevelObject::NamedObject(obj) = &tlo else {
                    unreachable!()
                };
                let path = output_dir.join(format!("obj_{}_{}.obj", obj.num, obj.gen));
                write_construct(&path, &tlo)?;
            }
            other => {
                warn!("object stream {carrier}: unexpected construct {other:?}");
                break;
            }
        }
    }
    Ok(())
}

fn cmd_assemble(inputs: &[PathBuf], output: &Path) -> Result<()> {
    anyhow::ensure!(!inputs.is_empty(), "no input files given");
    let mut out = BufWriter::new(
        File::create(output).with_context(|| format!("can't create {}", output.display()))?,
    );
    Version { major: 1, minor: 7 }.write_header(&mut out)?;

    let mut offsets: BTreeMap<ObjRef, u64> = BTreeMap::new();
    let mut trailer_dict = Object::Null;
    for input in inputs {
        let mut reader = PdfReader::open(input)
            .with_context(|| format!("can't open {} for reading", input.display()))?;
        let _ = reader.read_version()?;
        loop {
            match reader.read_top_level_object()? {
                TopLevelObject::Null => break,
                tlo @ TopLevelObject::NamedObject(_) => {
                    let TopLevelObject::NamedObject(obj) = &tlo else {
                        unreachable!()
                    };
                    let offset = out.stream_position()?;
                    offsets.insert(
                        ObjRef {
                            num: obj.num,
                            gen: obj.gen,
                        },
                        offset,
                    );
                    tlo.dump(&mut out, 0)?;
                    out.write_all(b"\n")?;
                }
                TopLevelObject::XRefTable(_) => info!("skipping xref table"),
                TopLevelObject::Trailer(trailer) => {
                    // The last trailer wins, as with incremental updates.
                    trailer_dict = trailer.dict;
                }
                TopLevelObject::StartXRef(_) => info!("skipping startxref marker"),
                TopLevelObject::Invalid(error) => {
                    eprintln!("{}: {error}", input.display());
                }
            }
        }
    }

    let entries = build_xref_entries(&offsets);
    let startxref = out.stream_position()?;
    out.write_all(b"xref\n")?;
    writeln!(out, "0 {}", entries.len())?;
    for entry in &entries {
        write!(
            out,
            "{:010} {:05} {} \n",
            entry.offset,
            entry.gen,
            if entry.in_use { 'n' } else { 'f' }
        )?;
    }
    out.write_all(b"trailer\n")?;
    let trailer_dict = with_size(trailer_dict, entries.len() as i64);
    trailer_dict.dump(&mut out, 1)?;
    write!(out, "\nstartxref\n{startxref}\n%%EOF\n")?;
    Ok(())
}

struct XRefEntry {
    offset: u64,
    gen: u64,
    in_use: bool,
}

/// Lay out one xref entry per object number, threading the free list
/// through the numbers nothing was written for. Entry 0 heads the free
/// list with generation 65535.
fn build_xref_entries(offsets: &BTreeMap<ObjRef, u64>) -> Vec<XRefEntry> {
    let size = offsets.keys().map(|r| r.num).max().map_or(1, |max| max + 1);
    let mut entries: Vec<XRefEntry> = (0..size)
        .map(|_| XRefEntry {
            offset: 0,
            gen: 0,
            in_use: false,
        })
        .collect();
    for (reference, &offset) in offsets {
        entries[reference.num as usize] = XRefEntry {
            offset,
            gen: reference.gen,
            in_use: true,
        };
    }
    let mut next_free = 0;
    for num in (0..entries.len()).rev() {
        if !entries[num].in_use {
            entries[num].offset = next_free;
            entries[num].gen = 65535;
            next_free = num as u64;
        }
    }
    entries
}

/// Refresh `/Size` on the trailer dictionary, synthesizing one when no
/// trailer was seen in the inputs
fn with_size(trailer: Object, size: i64) -> Object {
    let mut dict = match trailer {
        Object::Dictionary(dict) => dict,
        _ => Dictionary::new(),
    };
    dict.insert(b"Size".to_vec(), Object::Numeric(Numeric::from(size)));
    Object::Dictionary(dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets_of(pairs: &[(u64, u64, u64)]) -> BTreeMap<ObjRef, u64> {
        pairs
            .iter()
            .map(|&(num, gen, offset)| (ObjRef { num, gen }, offset))
            .collect()
    }

    #[test]
    fn test_xref_entries_free_list() {
        let offsets = offsets_of(&[(1, 0, 15), (3, 0, 99), (5, 2, 204)]);
        let entries = build_xref_entries(&offsets);
        assert_eq!(entries.len(), 6);

        // Free entries chain to the next free object number; the last
        // one points back to 0.
        assert!(!entries[0].in_use);
        assert_eq!(entries[0].offset, 2);
        assert_eq!(entries[0].gen, 65535);
        assert!(!entries[2].in_use);
        assert_eq!(entries[2].offset, 4);
        assert!(!entries[4].in_use);
        assert_eq!(entries[4].offset, 0);

        assert!(entries[1].in_use);
        assert_eq!((entries[1].offset, entries[1].gen), (15, 0));
        assert!(entries[5].in_use);
        assert_eq!((entries[5].offset, entries[5].gen), (204, 2));
    }

    #[test]
    fn test_xref_entries_empty_input() {
        let entries = build_xref_entries(&BTreeMap::new());
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].in_use);
        assert_eq!(entries[0].gen, 65535);
    }

    #[test]
    fn test_with_size_synthesizes_dictionary() {
        let Object::Dictionary(dict) = with_size(Object::Null, 4) else {
            panic!("expected dictionary")
        };
        assert_eq!(
            dict.get(b"Size").and_then(Object::as_numeric).and_then(Numeric::as_u64),
            Some(4)
        );
    }

    #[test]
    fn test_break_then_assemble_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let mut pdf = Vec::new();
        Version { major: 1, minor: 4 }.write_header(&mut pdf).unwrap();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        pdf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        pdf.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R >>\n");
        pdf.extend_from_slice(b"startxref\n0\n%%EOF\n");
        fs::write(&input, pdf).unwrap();

        let parts = dir.path().join("parts");
        cmd_break(&input, &parts, true).unwrap();
        assert!(parts.join("obj_1_0.obj").exists());
        assert!(parts.join("obj_2_0.obj").exists());
        assert!(parts.join("trailer_0.obj").exists());
        assert!(parts.join("startxref_0.obj").exists());

        let output = dir.path().join("out.pdf");
        cmd_assemble(
            &[
                parts.join("obj_1_0.obj"),
                parts.join("obj_2_0.obj"),
                parts.join("trailer_0.obj"),
            ],
            &output,
        )
        .unwrap();

        let bytes = fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));

        let mut reader = PdfReader::open(&output).unwrap();
        assert_eq!(
            reader.read_version().unwrap(),
            Some(Version { major: 1, minor: 7 })
        );
        let mut nums = Vec::new();
        let mut saw_trailer = false;
        let mut saw_startxref = false;
        loop {
            match reader.read_top_level_object().unwrap() {
                TopLevelObject::Null => break,
                TopLevelObject::NamedObject(obj) => {
                    assert!(!obj.failed());
                    nums.push(obj.num);
                }
                TopLevelObject::XRefTable(table) => {
                    assert_eq!(table.sections[0].count, 3);
                }
                TopLevelObject::Trailer(trailer) => {
                    let dict = trailer.dict.as_dict().unwrap();
                    assert_eq!(
                        dict.get(b"Size")
                            .and_then(Object::as_numeric)
                            .and_then(Numeric::as_u64),
                        Some(3)
                    );
                    saw_trailer = true;
                }
                TopLevelObject::StartXRef(_) => saw_startxref = true,
                TopLevelObject::Invalid(error) => panic!("invalid construct: {error}"),
            }
        }
        assert_eq!(nums, vec![1, 2]);
        assert!(saw_trailer);
        assert!(saw_startxref);
    }

    #[test]
    fn test_with_size_updates_existing() {
        let mut dict = Dictionary::new();
        dict.insert(b"Size".to_vec(), Object::Numeric(Numeric::from(1)));
        dict.insert(b"Root".to_vec(), Object::Indirect(ObjRef { num: 1, gen: 0 }));
        let Object::Dictionary(updated) = with_size(Object::Dictionary(dict), 9) else {
            panic!("expected dictionary")
        };
        assert_eq!(
            updated.get(b"Size").and_then(Object::as_numeric).and_then(Numeric::as_u64),
            Some(9)
        );
        assert!(updated.contains_key(b"Root"));
    }
}
