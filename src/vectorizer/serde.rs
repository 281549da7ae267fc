//! Line-oriented text format for embedding models.
//!
//! ```text
//! dtm-vectorizer-model 1
//! kind lsa                 (or rp)
//! element f32              element type at save time
//! dims <n> <k>
//! stats tfidf              (tf, tfidf, bm25)
//! kappa <κ>
//! beta <β>
//! avg_doc_length <value>
//! tol <value>              lsa only
//! density <value>          rp only
//! nnz <count>              rp only
//! [vocabulary]             n lines, one term each, column order
//! [idf]                    n lines
//! [sigma_inv]              lsa: k lines
//! [vt]                     lsa: k lines of n values
//! [r]                      rp: nnz lines "row col value", row-major
//! ```
//!
//! Values are written with the shortest representation that reads back to
//! the same element value and are parsed as `f64`, so a model saved as one
//! element type can be loaded as another.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use nalgebra::DMatrix;
use sprs::CsMat;
use tracing::info;

use crate::config::Bm25Params;
use crate::error::{Error, Result};
use crate::model::lsa::LsaModel;
use crate::model::rp::RpModel;
use crate::model::{AnyModel, EmbeddingModel, ModelKind};
use crate::utils::element::{Element, FloatElement};
use crate::vectorizer::lexicon::Lexicon;
use crate::vectorizer::tfidf::{Stats, WeightingState};

const MAGIC: &str = "dtm-vectorizer-model";
const FORMAT_VERSION: u32 = 1;

/// Models that can be written in the text format.
pub trait ModelText<F: FloatElement>: EmbeddingModel<F> {
    fn kind(&self) -> ModelKind;

    fn write_text(&self, out: &mut dyn Write) -> Result<()>;
}

impl<F: FloatElement> ModelText<F> for LsaModel<F> {
    fn kind(&self) -> ModelKind {
        ModelKind::Lsa
    }

    fn write_text(&self, out: &mut dyn Write) -> Result<()> {
        let (n, k) = self.size();
        write_header::<F>(out, ModelKind::Lsa, n, k, self.weighting())?;
        writeln!(out, "tol {}", self.tol())?;
        write_vocabulary(out, self.lexicon(), self.weighting())?;
        writeln!(out, "[sigma_inv]")?;
        for s in self.sigma_inv() {
            writeln!(out, "{s}")?;
        }
        writeln!(out, "[vt]")?;
        for row in self.vt().row_iter() {
            let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}", values.join(" "))?;
        }
        Ok(())
    }
}

impl<F: FloatElement> ModelText<F> for RpModel<F> {
    fn kind(&self) -> ModelKind {
        ModelKind::Rp
    }

    fn write_text(&self, out: &mut dyn Write) -> Result<()> {
        let (n, k) = self.size();
        write_header::<F>(out, ModelKind::Rp, n, k, self.weighting())?;
        writeln!(out, "density {}", self.density())?;
        writeln!(out, "nnz {}", self.projection().nnz())?;
        write_vocabulary(out, self.lexicon(), self.weighting())?;
        writeln!(out, "[r]")?;
        for (row, vec) in self.projection().outer_iterator().enumerate() {
            for (col, v) in vec.iter() {
                writeln!(out, "{row} {col} {v}")?;
            }
        }
        Ok(())
    }
}

impl<F: FloatElement> ModelText<F> for AnyModel<F> {
    fn kind(&self) -> ModelKind {
        AnyModel::kind(self)
    }

    fn write_text(&self, out: &mut dyn Write) -> Result<()> {
        match self {
            AnyModel::Lsa(m) => m.write_text(out),
            AnyModel::Rp(m) => m.write_text(out),
        }
    }
}

fn write_header<F: FloatElement>(
    out: &mut dyn Write,
    kind: ModelKind,
    n: usize,
    k: usize,
    weighting: &WeightingState<F>,
) -> Result<()> {
    writeln!(out, "{MAGIC} {FORMAT_VERSION}")?;
    writeln!(out, "kind {kind}")?;
    writeln!(out, "element {}", F::NAME)?;
    writeln!(out, "dims {n} {k}")?;
    writeln!(out, "stats {}", weighting.stats)?;
    writeln!(out, "kappa {}", weighting.bm25.kappa)?;
    writeln!(out, "beta {}", weighting.bm25.beta)?;
    writeln!(out, "avg_doc_length {}", weighting.avg_doc_length)?;
    Ok(())
}

fn write_vocabulary<F: FloatElement>(out: &mut dyn Write, lexicon: &Lexicon, weighting: &WeightingState<F>) -> Result<()> {
    writeln!(out, "[vocabulary]")?;
    for term in lexicon.terms() {
        writeln!(out, "{term}")?;
    }
    writeln!(out, "[idf]")?;
    for v in &weighting.idf {
        writeln!(out, "{v}")?;
    }
    Ok(())
}

/// Writes `model` in the text format.
///
/// # Errors
/// [`Error::InvalidParameter`] when a vocabulary term contains a line break
/// and could not be read back.
pub fn write_model<F, M, W>(model: &M, mut writer: W) -> Result<()>
where
    F: FloatElement,
    M: ModelText<F>,
    W: Write,
{
    if let Some(term) = model
        .lexicon()
        .terms()
        .find(|t| t.contains(|c: char| c == '\n' || c == '\r'))
    {
        return Err(Error::InvalidParameter(format!(
            "term {term:?} contains a line break and cannot be saved"
        )));
    }
    model.write_text(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Saves any model to `path`, replacing an existing file.
///
/// A failed write can leave a partial file behind.
pub fn save_model<F, M, P>(model: &M, path: P) -> Result<()>
where
    F: FloatElement,
    M: ModelText<F>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = fs::File::create(path)?;
    write_model(model, BufWriter::new(file))?;
    info!(path = %path.display(), kind = %<M as ModelText<F>>::kind(model), "saved model");
    Ok(())
}

pub fn save_lsa_model<F: FloatElement, P: AsRef<Path>>(model: &LsaModel<F>, path: P) -> Result<()> {
    save_model(model, path)
}

pub fn save_rp_model<F: FloatElement, P: AsRef<Path>>(model: &RpModel<F>, path: P) -> Result<()> {
    save_model(model, path)
}

/// Loads a model of either kind, converting values to `F`.
pub fn load_model<F: FloatElement, P: AsRef<Path>>(path: P) -> Result<AnyModel<F>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let model = read_model::<F>(&text)?;
    info!(path = %path.display(), kind = %model.kind(), element = F::NAME, "loaded model");
    Ok(model)
}

/// Loads an LSA model.
///
/// # Errors
/// [`Error::MalformedModelFile`] when the file holds another kind of model.
pub fn load_lsa_model<F: FloatElement, P: AsRef<Path>>(path: P) -> Result<LsaModel<F>> {
    match load_model(path)? {
        AnyModel::Lsa(model) => Ok(model),
        AnyModel::Rp(_) => Err(Error::malformed(2, "expected an lsa model, found rp")),
    }
}

pub fn load_rp_model<F: FloatElement, P: AsRef<Path>>(path: P) -> Result<RpModel<F>> {
    match load_model(path)? {
        AnyModel::Rp(model) => Ok(model),
        AnyModel::Lsa(_) => Err(Error::malformed(2, "expected an rp model, found lsa")),
    }
}

/// Parses a model from its text form.
pub fn read_model<F: FloatElement>(text: &str) -> Result<AnyModel<F>> {
    let mut lines = LineReader::new(text);

    let magic = lines.next_line()?;
    match magic.split_once(' ') {
        Some((MAGIC, version)) if version.trim() == FORMAT_VERSION.to_string() => {}
        Some((MAGIC, version)) => return Err(lines.error(format!("unsupported format version `{}`", version.trim()))),
        _ => return Err(lines.error("not a model file")),
    }
    let kind: ModelKind = lines.field_parsed("kind")?;
    let element = lines.field("element")?;
    if element.is_empty() {
        return Err(lines.error("missing element type"));
    }
    let dims = lines.field("dims")?;
    let (n, k) = match dims.split_whitespace().collect::<Vec<_>>()[..] {
        [n, k] => (lines.parse::<usize>(n, "vocabulary size")?, lines.parse::<usize>(k, "dimensionality")?),
        _ => return Err(lines.error("`dims` needs two values")),
    };
    if kind == ModelKind::Lsa && k > n {
        return Err(lines.error(format!("LSA rank {k} exceeds the vocabulary size {n}")));
    }
    let stats: Stats = lines.field_parsed("stats")?;
    let kappa: f64 = lines.field_parsed("kappa")?;
    let beta: f64 = lines.field_parsed("beta")?;
    let avg_doc_length: f64 = lines.field_parsed("avg_doc_length")?;

    let model = match kind {
        ModelKind::Lsa => {
            let tol: f64 = lines.field_parsed("tol")?;
            let (lexicon, idf) = read_vocabulary::<F>(&mut lines, n)?;
            lines.section("sigma_inv")?;
            let mut sigma_inv = Vec::new();
            for _ in 0..k {
                let line = lines.next_line()?;
                sigma_inv.push(lines.value::<F>(line)?);
            }
            lines.section("vt")?;
            let mut values = Vec::new();
            for _ in 0..k {
                let line = lines.next_line()?;
                let row: Vec<&str> = line.split_whitespace().collect();
                if row.len() != n {
                    return Err(lines.error(format!("expected {n} values, found {}", row.len())));
                }
                for v in row {
                    values.push(lines.value::<F>(v)?);
                }
            }
            lines.finish()?;
            let weighting = weighting_state(stats, idf, avg_doc_length, kappa, beta);
            let vt = DMatrix::from_row_slice(k, n, &values);
            AnyModel::Lsa(LsaModel::from_parts(lexicon, weighting, sigma_inv, vt, F::from_f64_lossy(tol))?)
        }
        ModelKind::Rp => {
            let density: f64 = lines.field_parsed("density")?;
            let nnz: usize = lines.field_parsed("nnz")?;
            if n.checked_mul(k).map_or(true, |cells| nnz > cells) {
                return Err(lines.error(format!("{nnz} entries do not fit a {n}x{k} projection")));
            }
            let (lexicon, idf) = read_vocabulary::<F>(&mut lines, n)?;
            lines.section("r")?;
            let mut indptr = vec![0usize; n + 1];
            let mut indices = Vec::new();
            let mut data = Vec::new();
            let mut last: Option<(usize, usize)> = None;
            for _ in 0..nnz {
                let line = lines.next_line()?;
                let (row, col, v) = match line.split_whitespace().collect::<Vec<_>>()[..] {
                    [row, col, v] => (
                        lines.parse::<usize>(row, "row")?,
                        lines.parse::<usize>(col, "column")?,
                        lines.value::<F>(v)?,
                    ),
                    _ => return Err(lines.error("expected `row col value`")),
                };
                if row >= n || col >= k {
                    return Err(lines.error(format!("entry ({row}, {col}) outside {n}x{k}")));
                }
                if last.is_some_and(|prev| prev >= (row, col)) {
                    return Err(lines.error("entries must be in row-major order without duplicates"));
                }
                last = Some((row, col));
                indptr[row + 1] += 1;
                indices.push(col);
                data.push(v);
            }
            lines.finish()?;
            for i in 0..n {
                indptr[i + 1] += indptr[i];
            }
            let r = CsMat::new((n, k), indptr, indices, data);
            let weighting = weighting_state(stats, idf, avg_doc_length, kappa, beta);
            AnyModel::Rp(RpModel::from_parts(lexicon, weighting, r, density)?)
        }
    };
    Ok(model)
}

fn weighting_state<F: FloatElement>(stats: Stats, idf: Vec<F>, avg_doc_length: f64, kappa: f64, beta: f64) -> WeightingState<F> {
    WeightingState {
        stats,
        idf,
        avg_doc_length: F::from_f64_lossy(avg_doc_length),
        bm25: Bm25Params::new(kappa, beta),
    }
}

fn read_vocabulary<F: FloatElement>(lines: &mut LineReader<'_>, n: usize) -> Result<(Lexicon, Vec<F>)> {
    lines.section("vocabulary")?;
    let mut lexicon = Lexicon::new();
    for i in 0..n {
        let term = lines.next_line()?;
        if lexicon.insert(term) != i {
            return Err(lines.error(format!("duplicate term {term:?}")));
        }
    }
    lines.section("idf")?;
    let mut idf = Vec::new();
    for _ in 0..n {
        let line = lines.next_line()?;
        idf.push(lines.value::<F>(line)?);
    }
    Ok((lexicon, idf))
}

/// Cursor over the lines of a model file that knows its 1-based line number.
struct LineReader<'a> {
    lines: std::str::Lines<'a>,
    line: usize,
}

impl<'a> LineReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.line, reason)
    }

    fn next_line(&mut self) -> Result<&'a str> {
        self.line += 1;
        self.lines
            .next()
            .ok_or_else(|| Error::malformed(self.line, "unexpected end of file"))
    }

    /// `<key> <value>`, returning the value.
    fn field(&mut self, key: &str) -> Result<&'a str> {
        let line = self.next_line()?;
        match line.split_once(' ') {
            Some((found, value)) if found == key => Ok(value.trim()),
            _ if line == key => Ok(""),
            _ => Err(self.error(format!("expected `{key}`"))),
        }
    }

    fn field_parsed<T: FromStr>(&mut self, key: &str) -> Result<T> {
        let value = self.field(key)?;
        self.parse(value, key)
    }

    fn section(&mut self, name: &str) -> Result<()> {
        let line = self.next_line()?;
        if line.trim() == format!("[{name}]") {
            Ok(())
        } else {
            Err(self.error(format!("expected section [{name}]")))
        }
    }

    fn parse<T: FromStr>(&self, s: &str, what: &str) -> Result<T> {
        s.trim()
            .parse()
            .map_err(|_| self.error(format!("invalid {what} `{s}`")))
    }

    /// Numeric value, read as `f64` and converted to the target element.
    fn value<F: Element>(&self, s: &str) -> Result<F> {
        let v: f64 = self.parse(s, "number")?;
        Ok(F::from_f64_lossy(v))
    }

    /// Only blank lines may follow the last section.
    fn finish(&mut self) -> Result<()> {
        for rest in self.lines.by_ref() {
            self.line += 1;
            if !rest.trim().is_empty() {
                return Err(Error::malformed(self.line, "unexpected content after the last section"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LsaConfig, RpConfig};
    use crate::vectorizer::{dtm, DocumentTermMatrix};

    fn counts() -> DocumentTermMatrix {
        let docs = vec!["a b c", "b c d d", "e f a", "f f f g"];
        let lex = Lexicon::sorted(docs.iter().flat_map(|d| d.split(' ')));
        dtm(&docs, &lex)
    }

    fn to_text<F: FloatElement, M: ModelText<F>>(model: &M) -> String {
        let mut buf = Vec::new();
        write_model(model, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn lsa_text_roundtrip() {
        let model: LsaModel = LsaModel::new(&counts(), LsaConfig::default().with_k(3)).unwrap();
        let text = to_text(&model);
        assert!(text.starts_with("dtm-vectorizer-model 1\nkind lsa\nelement f64\ndims 7 3\nstats tfidf\n"));
        let back = read_model::<f64>(&text).unwrap();
        assert_eq!(back.as_lsa(), Some(&model));
    }

    #[test]
    fn rp_text_roundtrip_with_element_change() {
        let model: RpModel = RpModel::new(&counts(), RpConfig::default().with_k(4).with_seed(1)).unwrap();
        let back = read_model::<f32>(&to_text(&model)).unwrap();
        let back = back.as_rp().unwrap();
        assert_eq!(back.projection().nnz(), model.projection().nnz());
        let query = "a b d f";
        for (x, y) in model.embed(query).iter().zip(back.embed(query)) {
            assert!((*x as f32 - y).abs() < 1e-5);
        }
    }

    #[test]
    fn rejects_broken_files() {
        let model: LsaModel = LsaModel::new(&counts(), LsaConfig::default().with_k(2)).unwrap();
        let text = to_text(&model);

        let err = read_model::<f64>("something else\n").unwrap_err();
        assert!(matches!(err, Error::MalformedModelFile { line: 1, .. }));

        let wrong_version = text.replacen("dtm-vectorizer-model 1", "dtm-vectorizer-model 9", 1);
        assert!(matches!(read_model::<f64>(&wrong_version), Err(Error::MalformedModelFile { line: 1, .. })));

        let truncated: String = text.lines().take(20).collect::<Vec<_>>().join("\n");
        assert!(matches!(read_model::<f64>(&truncated), Err(Error::MalformedModelFile { .. })));

        let bad_dims = text.replacen("dims 7 2", "dims 7 x", 1);
        assert!(matches!(read_model::<f64>(&bad_dims), Err(Error::MalformedModelFile { line: 4, .. })));

        let bad_stats = text.replacen("stats tfidf", "stats idf", 1);
        assert!(matches!(read_model::<f64>(&bad_stats), Err(Error::MalformedModelFile { line: 5, .. })));

        let trailing = format!("{text}garbage\n");
        assert!(matches!(read_model::<f64>(&trailing), Err(Error::MalformedModelFile { .. })));
    }

    #[test]
    fn oversized_headers_fail_before_reading_the_body() {
        let lsa = "dtm-vectorizer-model 1\nkind lsa\nelement f64\ndims 1 4611686018427387903\nstats tf\n";
        assert!(matches!(read_model::<f64>(lsa), Err(Error::MalformedModelFile { line: 4, .. })));

        let header = "dtm-vectorizer-model 1\nkind rp\nelement f64\ndims 4611686018427387903 4\nstats tf\n\
                      kappa 1.5\nbeta 0.75\navg_doc_length 1\ndensity 0.5\n";
        let overflow = format!("{header}nnz {}\n", usize::MAX);
        assert!(matches!(read_model::<f64>(&overflow), Err(Error::MalformedModelFile { line: 10, .. })));

        let model: RpModel = RpModel::new(&counts(), RpConfig::default().with_k(2).with_seed(3)).unwrap();
        let text = to_text(&model);
        let nnz = model.projection().nnz();
        let too_many = text.replacen(&format!("nnz {nnz}\n"), "nnz 15\n", 1);
        assert!(matches!(read_model::<f64>(&too_many), Err(Error::MalformedModelFile { .. })));
    }

    #[test]
    fn rejects_unordered_projection_entries() {
        let model: RpModel = RpModel::new(&counts(), RpConfig::default().with_k(3).with_density(1.0).with_seed(4)).unwrap();
        let text = to_text(&model);
        let mut lines: Vec<&str> = text.lines().collect();
        let len = lines.len();
        lines.swap(len - 1, len - 2);
        let swapped = lines.join("\n");
        assert!(matches!(read_model::<f64>(&swapped), Err(Error::MalformedModelFile { .. })));
    }

    #[test]
    fn terms_with_line_breaks_are_refused() {
        let docs = vec![vec!["line\nbreak".to_string(), "x".to_string()], vec!["x".to_string()]];
        let lex = Lexicon::sorted(["line\nbreak", "x"]);
        let m: DocumentTermMatrix = dtm(&docs, &lex);
        let model: LsaModel = LsaModel::new(&m, LsaConfig::default().with_k(1)).unwrap();
        let mut buf = Vec::new();
        assert!(matches!(write_model(&model, &mut buf), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn file_roundtrip_and_kind_checks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.txt");
        let model: RpModel = RpModel::new(&counts(), RpConfig::default().with_seed(8)).unwrap();
        save_rp_model(&model, &path).unwrap();
        assert_eq!(load_rp_model::<f64, _>(&path).unwrap(), model);
        assert!(matches!(load_lsa_model::<f64, _>(&path), Err(Error::MalformedModelFile { .. })));
        assert!(matches!(load_model::<f64, _>(dir.path().join("missing")), Err(Error::Io(_))));
    }
}
