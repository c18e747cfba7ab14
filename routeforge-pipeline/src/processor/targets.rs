use std::io::{self, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use geo::{Coord, Geometry, LineString, Polygon};
use log::{info, warn};
use routeforge_core::graph::write_graph;
use routeforge_core::Feature;
use routeforge_data::{EntitySummary, GraphBuilder};
use routeforge_fs::{OutputFile, remove_utf8_file};
use serde_json::{Value, json};

use super::{TargetProcessor, unexpected};
use crate::error::StageFailure;
use crate::record::{Record, RecordKind};

fn io_failure(path: &Utf8Path) -> impl FnOnce(io::Error) -> StageFailure + '_ {
    move |source| StageFailure::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn json_failure(path: &Utf8Path) -> impl FnOnce(serde_json::Error) -> StageFailure + '_ {
    move |source| StageFailure::Json {
        path: path.to_path_buf(),
        source,
    }
}

/// Flush the buffer and keep the file.
fn commit(writer: BufWriter<OutputFile>, path: &Utf8Path) -> Result<Utf8PathBuf, StageFailure> {
    let output = writer
        .into_inner()
        .map_err(|err| io_failure(path)(err.into_error()))?;
    output.commit().map_err(io_failure(path))
}

/// Builds a routing graph and writes it when the stream ends.
pub struct GraphTarget {
    output: OutputFile,
    builder: GraphBuilder,
    map: Option<Utf8PathBuf>,
}

impl GraphTarget {
    /// Target writing to `output`. `map` names the node store file the
    /// builder spills to, if any.
    pub fn new(output: OutputFile, builder: GraphBuilder, map: Option<Utf8PathBuf>) -> Self {
        Self {
            output,
            builder,
            map,
        }
    }

    fn write(output: OutputFile, builder: GraphBuilder) -> Result<Utf8PathBuf, StageFailure> {
        let path = output.path().to_path_buf();
        let (graph, stats) = builder.finish()?;
        let mut writer = BufWriter::new(output);
        write_graph(&mut writer, &graph)?;
        let committed = commit(writer, &path)?;
        info!(
            "wrote routing graph {committed}: {} vertices, {} edges, {} weight tables ({} routable ways, {} skipped)",
            graph.vertices.len(),
            graph.edges.len(),
            graph.weights.len(),
            stats.routable_ways,
            stats.skipped_ways
        );
        Ok(committed)
    }
}

impl TargetProcessor for GraphTarget {
    fn consume(&mut self, record: Record) -> Result<(), StageFailure> {
        match record {
            Record::Entity(entity) => Ok(self.builder.consume(&entity)?),
            other @ Record::Feature(_) => Err(unexpected(RecordKind::Entity, &other)),
        }
    }

    fn finish(self: Box<Self>) -> Result<Vec<Utf8PathBuf>, StageFailure> {
        let Self {
            output,
            builder,
            map,
        } = *self;
        match Self::write(output, builder) {
            Ok(graph) => Ok(std::iter::once(graph).chain(map).collect()),
            Err(err) => {
                // The node store was committed by the builder; drop it with the graph.
                if let Some(map) = map
                    && let Err(remove) = remove_utf8_file(&map)
                {
                    warn!("failed to remove node store {map}: {remove}");
                }
                Err(err)
            }
        }
    }
}

fn position(coord: Coord<f64>) -> [f64; 2] {
    [coord.x, coord.y]
}

fn line(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.coords().copied().map(position).collect()
}

fn rings(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(line)
        .collect()
}

/// GeoJSON geometry object, or the geometry type name when it has no
/// GeoJSON counterpart here.
fn geometry_json(geometry: &Geometry<f64>) -> Result<Value, &'static str> {
    Ok(match geometry {
        Geometry::Point(point) => json!({ "type": "Point", "coordinates": position(point.0) }),
        Geometry::LineString(ls) => json!({ "type": "LineString", "coordinates": line(ls) }),
        Geometry::Polygon(polygon) => json!({ "type": "Polygon", "coordinates": rings(polygon) }),
        Geometry::MultiPoint(points) => json!({
            "type": "MultiPoint",
            "coordinates": points.iter().map(|point| position(point.0)).collect::<Vec<_>>(),
        }),
        Geometry::MultiLineString(lines) => json!({
            "type": "MultiLineString",
            "coordinates": lines.iter().map(line).collect::<Vec<_>>(),
        }),
        Geometry::MultiPolygon(polygons) => json!({
            "type": "MultiPolygon",
            "coordinates": polygons.iter().map(rings).collect::<Vec<_>>(),
        }),
        Geometry::Line(_) => return Err("Line"),
        Geometry::GeometryCollection(_) => return Err("GeometryCollection"),
        Geometry::Rect(_) => return Err("Rect"),
        Geometry::Triangle(_) => return Err("Triangle"),
    })
}

fn feature_json(feature: &Feature) -> Result<Value, StageFailure> {
    let geometry =
        geometry_json(&feature.geometry).map_err(|geometry| StageFailure::UnsupportedGeometry {
            id: feature.id.clone(),
            geometry,
        })?;
    Ok(json!({
        "type": "Feature",
        "id": feature.id,
        "geometry": geometry,
        "properties": feature.properties,
    }))
}

/// Streams features into a GeoJSON `FeatureCollection`.
pub struct GeoJsonTarget {
    path: Utf8PathBuf,
    writer: BufWriter<OutputFile>,
    features: u64,
}

impl GeoJsonTarget {
    /// Create the output and write the collection header.
    pub fn create(path: &Utf8Path) -> io::Result<Self> {
        let mut writer = BufWriter::new(OutputFile::create(path)?);
        writer.write_all(br#"{"type":"FeatureCollection","features":["#)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            features: 0,
        })
    }
}

impl TargetProcessor for GeoJsonTarget {
    fn consume(&mut self, record: Record) -> Result<(), StageFailure> {
        let feature = match record {
            Record::Feature(feature) => feature,
            other @ Record::Entity(_) => return Err(unexpected(RecordKind::Feature, &other)),
        };
        let value = feature_json(&feature)?;
        let separator: &[u8] = if self.features == 0 { b"\n" } else { b",\n" };
        self.writer
            .write_all(separator)
            .map_err(io_failure(&self.path))?;
        serde_json::to_writer(&mut self.writer, &value).map_err(json_failure(&self.path))?;
        self.features += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<Utf8PathBuf>, StageFailure> {
        let Self {
            path,
            mut writer,
            features,
        } = *self;
        writer.write_all(b"\n]}\n").map_err(io_failure(&path))?;
        let committed = commit(writer, &path)?;
        info!("wrote {features} features to {committed}");
        Ok(vec![committed])
    }
}

/// Counts entities and writes the summary as JSON.
pub struct SummaryTarget {
    path: Utf8PathBuf,
    output: OutputFile,
    summary: EntitySummary,
}

impl SummaryTarget {
    /// Create the output file.
    pub fn create(path: &Utf8Path) -> io::Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            output: OutputFile::create(path)?,
            summary: EntitySummary::default(),
        })
    }
}

impl TargetProcessor for SummaryTarget {
    fn consume(&mut self, record: Record) -> Result<(), StageFailure> {
        match &record {
            Record::Entity(entity) => {
                self.summary.record(entity);
                Ok(())
            }
            Record::Feature(_) => Err(unexpected(RecordKind::Entity, &record)),
        }
    }

    fn finish(self: Box<Self>) -> Result<Vec<Utf8PathBuf>, StageFailure> {
        let Self {
            path,
            output,
            summary,
        } = *self;
        let mut writer = BufWriter::new(output);
        serde_json::to_writer_pretty(&mut writer, &summary).map_err(json_failure(&path))?;
        writer.write_all(b"\n").map_err(io_failure(&path))?;
        let committed = commit(writer, &path)?;
        info!(
            "summarised {} nodes, {} ways and {} relations into {committed}",
            summary.nodes, summary.ways, summary.relations
        );
        Ok(vec![committed])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Point, polygon};
    use routeforge_core::EntityKind;
    use routeforge_core::test_support::sample_town;
    use routeforge_data::FeatureBuilder;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn workspace() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, root)
    }

    fn town_features() -> Vec<Feature> {
        let mut builder = FeatureBuilder::new(Vec::new());
        sample_town()
            .iter()
            .filter_map(|entity| builder.feature(entity).expect("in-memory store"))
            .collect()
    }

    #[rstest]
    fn geojson_collects_every_feature(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("town.geojson");
        let mut target = Box::new(GeoJsonTarget::create(&path).expect("create"));
        for feature in town_features() {
            target.consume(Record::Feature(feature)).expect("consume");
        }
        let outputs = target.finish().expect("finish");
        assert_eq!(outputs, [path.clone()]);

        let text = std::fs::read_to_string(&path).expect("read back");
        let value: Value = serde_json::from_str(&text).expect("valid JSON");
        assert_eq!(value["type"], "FeatureCollection");
        let features = value["features"].as_array().expect("features array");
        assert_eq!(features.len(), 6);
        let building = features
            .iter()
            .find(|feature| feature["id"] == "way/103")
            .expect("building feature");
        assert_eq!(building["geometry"]["type"], "Polygon");
        assert_eq!(building["properties"]["building"], "yes");
    }

    #[rstest]
    fn empty_geojson_is_still_a_collection(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("empty.geojson");
        let target = Box::new(GeoJsonTarget::create(&path).expect("create"));
        target.finish().expect("finish");
        let value: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(value["features"].as_array().map(Vec::len), Some(0));
    }

    #[rstest]
    fn unfinished_targets_leave_nothing_behind(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("partial.geojson");
        {
            let mut target = GeoJsonTarget::create(&path).expect("create");
            let feature = Feature::new(
                EntityKind::Node,
                1,
                Geometry::Point(Point::new(4.0, 50.0)),
                Default::default(),
            );
            target.consume(Record::Feature(feature)).expect("consume");
        }
        assert!(!path.exists());
    }

    #[test]
    fn polygons_render_closed_rings() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let value = geometry_json(&Geometry::Polygon(square)).expect("supported");
        let ring = value["coordinates"][0].as_array().expect("ring");
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn rects_are_not_exported() {
        let rect = geo::Rect::new((0.0, 0.0), (1.0, 1.0));
        assert_eq!(geometry_json(&Geometry::Rect(rect)), Err("Rect"));
    }

    #[rstest]
    fn summary_counts_entities(workspace: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = workspace;
        let path = root.join("summary.json");
        let mut target = Box::new(SummaryTarget::create(&path).expect("create"));
        for entity in sample_town() {
            target.consume(Record::Entity(entity)).expect("consume");
        }
        target.finish().expect("finish");
        let value: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(value["nodes"], 5);
        assert_eq!(value["ways"], 4);
        assert_eq!(value["relations"], 1);
        assert_eq!(value["bounds"]["right"], 4.03);
    }
}
